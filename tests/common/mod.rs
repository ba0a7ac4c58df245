#![allow(dead_code)]

use async_trait::async_trait;
use roomwatch::delta::MembershipDelta;
use roomwatch::probe::{
    ConnectionCounter, ProbeError, Probes, ResourceStats, ResourceStatsProbe, ServiceStatus,
    ServiceStatusProbe, UptimeInfo,
};
use roomwatch::report::{PresenceSummary, StatusReport};
use roomwatch::sink::{CounterSink, DisplaySink, NotificationSink, PresenceSink, SinkError};
use roomwatch::source::{LogWindowSource, SourceError};
use roomwatch::{Event, MembershipSnapshot, reduce};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub fn group_join(group: &str, user: &str) -> Event {
    Event::GroupJoin {
        group: group.to_string(),
        user: user.to_string(),
    }
}

pub fn group_leave(group: &str, user: &str) -> Event {
    Event::GroupLeave {
        group: group.to_string(),
        user: user.to_string(),
    }
}

pub fn user_join(user: &str) -> Event {
    Event::UserJoin {
        user: user.to_string(),
    }
}

pub fn user_leave(user: &str) -> Event {
    Event::UserLeave {
        user: user.to_string(),
    }
}

/// Build a snapshot through the public fold.
pub fn snap(entries: &[(&str, &[&str])]) -> MembershipSnapshot {
    let mut events = Vec::new();
    for (group, users) in entries {
        for user in *users {
            events.push(group_join(group, user));
        }
    }
    reduce(events)
}

pub fn members(snapshot: &MembershipSnapshot, group: &str) -> Vec<String> {
    snapshot.members(group).unwrap_or_default().to_vec()
}

/// Replays scripted fetch results in order; once the script is exhausted the
/// last successful window repeats forever.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Result<Vec<String>, SourceError>>>,
    repeat: Mutex<Vec<String>>,
    /// The `max_lines` argument of every fetch call.
    pub requested: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Result<Vec<String>, SourceError>>) -> Self {
        ScriptedSource {
            steps: Mutex::new(steps.into()),
            repeat: Mutex::new(Vec::new()),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All-success script from raw lines.
    pub fn lines(windows: Vec<Vec<&str>>) -> Self {
        Self::new(
            windows
                .into_iter()
                .map(|window| Ok(window.into_iter().map(str::to_string).collect()))
                .collect(),
        )
    }
}

#[async_trait]
impl LogWindowSource for ScriptedSource {
    async fn fetch(&self, max_lines: usize) -> Result<Vec<String>, SourceError> {
        self.requested.lock().unwrap().push(max_lines);
        let next = self.steps.lock().unwrap().pop_front();
        match next {
            Some(Ok(lines)) => {
                *self.repeat.lock().unwrap() = lines.clone();
                Ok(lines)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.repeat.lock().unwrap().clone()),
        }
    }
}

pub fn fetch_failure() -> SourceError {
    SourceError::Command {
        code: Some(1),
        stderr: "journal unavailable".to_string(),
    }
}

#[derive(Clone)]
pub struct RecordingDisplay {
    /// The handle passed in on each publish call.
    pub calls: Arc<Mutex<Vec<Option<String>>>>,
    /// The handle this sink hands back.
    pub handle: String,
}

impl RecordingDisplay {
    pub fn returning(handle: &str) -> Self {
        RecordingDisplay {
            calls: Arc::new(Mutex::new(Vec::new())),
            handle: handle.to_string(),
        }
    }
}

#[async_trait]
impl DisplaySink for RecordingDisplay {
    async fn publish(
        &self,
        _report: &StatusReport,
        handle: Option<&str>,
    ) -> Result<String, SinkError> {
        self.calls.lock().unwrap().push(handle.map(str::to_string));
        Ok(self.handle.clone())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifications {
    pub batches: Arc<Mutex<Vec<Vec<MembershipDelta>>>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifications {
    async fn notify(&self, deltas: &[MembershipDelta]) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(deltas.to_vec());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingPresence {
    pub summaries: Arc<Mutex<Vec<PresenceSummary>>>,
}

#[async_trait]
impl PresenceSink for RecordingPresence {
    async fn publish(&self, summary: &PresenceSummary) -> Result<(), SinkError> {
        self.summaries.lock().unwrap().push(*summary);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingCounter {
    pub counts: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl CounterSink for RecordingCounter {
    async fn publish(&self, users: usize) -> Result<(), SinkError> {
        self.counts.lock().unwrap().push(users);
        Ok(())
    }
}

struct FakeServiceProbe {
    active: bool,
}

#[async_trait]
impl ServiceStatusProbe for FakeServiceProbe {
    async fn status(&self) -> Result<ServiceStatus, ProbeError> {
        Ok(ServiceStatus {
            active: self.active,
            pid: None,
        })
    }

    async fn uptime(&self) -> UptimeInfo {
        UptimeInfo::default()
    }
}

struct FakeConnectionCounter(usize);

#[async_trait]
impl ConnectionCounter for FakeConnectionCounter {
    async fn established(&self) -> Result<usize, ProbeError> {
        Ok(self.0)
    }
}

struct FakeResources;

#[async_trait]
impl ResourceStatsProbe for FakeResources {
    async fn sample(&self, _service_pid: Option<u32>) -> ResourceStats {
        ResourceStats::default()
    }
}

/// Probes that answer instantly: service up, three connections, zero stats.
pub fn test_probes() -> Probes {
    Probes {
        service: Box::new(FakeServiceProbe { active: true }),
        connections: Box::new(FakeConnectionCounter(3)),
        resources: Box::new(FakeResources),
    }
}
