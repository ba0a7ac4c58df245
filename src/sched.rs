//! The poll scheduler: independently-timed recurring tasks over one monitor.
//!
//! Single-threaded cooperative scheduling. Each task owns its own timer, so
//! a slow external call delays only that task's next tick; the shared
//! critical section lives inside [`Monitor::poll`]. No internal error
//! terminates the scheduler; failed cycles are logged and skipped, and the
//! next tick retries independently.

use crate::monitor::Monitor;
use crate::probe::Probes;
use crate::report::{self, PresenceSummary};
use crate::sink::{CounterSink, DisplaySink, NotificationSink, PresenceSink};
use crate::source::LogWindowSource;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Periods of the four recurring tasks.
#[derive(Debug, Clone, Copy)]
pub struct TaskIntervals {
    pub display: Duration,
    pub presence: Duration,
    pub notify: Duration,
    pub counter: Duration,
}

impl Default for TaskIntervals {
    fn default() -> Self {
        TaskIntervals {
            display: Duration::from_secs(60),
            presence: Duration::from_secs(120),
            notify: Duration::from_secs(30),
            counter: Duration::from_secs(300),
        }
    }
}

/// The outbound sinks. Notification and counter are optional; tasks whose
/// sink is absent are not started at all.
pub struct Outputs {
    pub display: Box<dyn DisplaySink>,
    pub presence: Box<dyn PresenceSink>,
    pub notify: Option<Box<dyn NotificationSink>>,
    pub counter: Option<Box<dyn CounterSink>>,
}

/// Run all scheduled tasks until `shutdown` flips.
///
/// The notification task is the one that advances the persisted snapshot
/// (it consumes the deltas). Without a notification sink the display task
/// advances instead, so the persisted state still tracks reality. In-flight
/// ticks finish before the function returns; the store's save step is atomic
/// per call, so shutdown can never corrupt it.
pub async fn run<S: LogWindowSource>(
    monitor: Arc<Monitor<S>>,
    probes: Probes,
    outputs: Outputs,
    intervals: TaskIntervals,
    shutdown: watch::Receiver<bool>,
) {
    let Outputs {
        display,
        presence,
        notify,
        counter,
    } = outputs;
    let monitor = monitor.as_ref();
    let probes = &probes;
    let display_advances = notify.is_none();

    info!(
        "scheduler started (display {:?}, presence {:?}, notify {}, counter {})",
        intervals.display,
        intervals.presence,
        if notify.is_some() { "on" } else { "off" },
        if counter.is_some() { "on" } else { "off" },
    );

    let display_task = {
        let mut shutdown = shutdown.clone();
        let sink = display.as_ref();
        async move {
            let mut ticker = interval(intervals.display);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        display_cycle(monitor, probes, sink, display_advances).await;
                    }
                }
            }
        }
    };

    let presence_task = {
        let mut shutdown = shutdown.clone();
        let sink = presence.as_ref();
        async move {
            let mut ticker = interval(intervals.presence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => presence_cycle(monitor, probes, sink).await,
                }
            }
        }
    };

    let notify_task = {
        let mut shutdown = shutdown.clone();
        let sink = notify.as_deref();
        async move {
            let Some(sink) = sink else { return };
            let mut ticker = interval(intervals.notify);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => notify_cycle(monitor, sink).await,
                }
            }
        }
    };

    let counter_task = {
        let mut shutdown = shutdown.clone();
        let sink = counter.as_deref();
        async move {
            let Some(sink) = sink else { return };
            let mut ticker = interval(intervals.counter);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_published: Option<usize> = None;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        counter_cycle(monitor, sink, &mut last_published).await;
                    }
                }
            }
        }
    };

    tokio::join!(display_task, presence_task, notify_task, counter_task);
    info!("scheduler stopped");
}

async fn display_cycle<S: LogWindowSource>(
    monitor: &Monitor<S>,
    probes: &Probes,
    sink: &dyn DisplaySink,
    advancing: bool,
) {
    let snapshot = if advancing {
        monitor.poll().await.map(|outcome| outcome.snapshot)
    } else {
        monitor.observe().await
    };
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("display refresh skipped: {e}");
            return;
        }
    };

    let report = report::gather(snapshot, probes).await;
    let handle = monitor.display_handle().await;
    match sink.publish(&report, handle.as_deref()).await {
        Ok(new_handle) => {
            if handle.as_deref() != Some(new_handle.as_str()) {
                monitor.set_display_handle(Some(new_handle)).await;
            }
        }
        Err(e) => warn!("display publish failed: {e}"),
    }
}

async fn presence_cycle<S: LogWindowSource>(
    monitor: &Monitor<S>,
    probes: &Probes,
    sink: &dyn PresenceSink,
) {
    let snapshot = match monitor.observe().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("presence refresh skipped: {e}");
            return;
        }
    };
    let server_up = match probes.service.status().await {
        Ok(status) => status.active,
        Err(e) => {
            warn!("service status probe failed: {e}");
            false
        }
    };
    let summary = PresenceSummary {
        users: snapshot.user_count(),
        groups: snapshot.group_count(),
        server_up,
    };
    if let Err(e) = sink.publish(&summary).await {
        warn!("presence publish failed: {e}");
    }
}

async fn notify_cycle<S: LogWindowSource>(monitor: &Monitor<S>, sink: &dyn NotificationSink) {
    match monitor.poll().await {
        Err(e) => warn!("notification check skipped: {e}"),
        Ok(outcome) if outcome.deltas.is_empty() => {}
        Ok(outcome) => {
            if let Err(e) = sink.notify(&outcome.deltas).await {
                warn!("notification publish failed: {e}");
            }
        }
    }
}

async fn counter_cycle<S: LogWindowSource>(
    monitor: &Monitor<S>,
    sink: &dyn CounterSink,
    last_published: &mut Option<usize>,
) {
    let snapshot = match monitor.observe().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("counter refresh skipped: {e}");
            return;
        }
    };
    let users = snapshot.user_count();
    // Channel renames are rate limited, so unchanged counts are skipped.
    if *last_published == Some(users) {
        return;
    }
    match sink.publish(users).await {
        Ok(()) => *last_published = Some(users),
        Err(e) => warn!("counter publish failed: {e}"),
    }
}
