//! Assembly of the status payloads handed to the outbound sinks.

use crate::probe::{Probes, ResourceStats, ServiceStatus, UptimeInfo};
use crate::reduce::MembershipSnapshot;
use chrono::{DateTime, Utc};
use log::warn;
use std::time::Duration;

/// Everything the display surface shows for one cycle: the inferred rooms
/// plus the service's vital signs.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub snapshot: MembershipSnapshot,
    pub service: ServiceStatus,
    pub connections: usize,
    pub stats: ResourceStats,
    pub uptime: UptimeInfo,
    pub generated_at: DateTime<Utc>,
}

impl StatusReport {
    pub fn summary(&self) -> PresenceSummary {
        PresenceSummary {
            users: self.snapshot.user_count(),
            groups: self.snapshot.group_count(),
            server_up: self.service.active,
        }
    }
}

/// The compact summary consumed by the presence and counter sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSummary {
    pub users: usize,
    pub groups: usize,
    pub server_up: bool,
}

/// Gather a [`StatusReport`] around an already-reduced snapshot.
///
/// Probe failures degrade to defaults with a warning; a dead probe must not
/// take the display down with it.
pub async fn gather(snapshot: MembershipSnapshot, probes: &Probes) -> StatusReport {
    let service = match probes.service.status().await {
        Ok(status) => status,
        Err(e) => {
            warn!("service status probe failed: {e}");
            ServiceStatus::default()
        }
    };

    let connections = match probes.connections.established().await {
        Ok(n) => n,
        Err(e) => {
            warn!("connection counter failed: {e}");
            0
        }
    };

    let stats = probes.resources.sample(service.pid).await;
    let uptime = probes.service.uptime().await;

    StatusReport {
        snapshot,
        service,
        connections,
        stats,
        uptime,
        generated_at: Utc::now(),
    }
}

/// Render a duration as `1d 2h 3m`, omitting zero components; anything under
/// a minute is `< 1m`.
///
/// # Examples
///
/// ```
/// use roomwatch::report::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90_180)), "1d 1h 3m");
/// assert_eq!(format_duration(Duration::from_secs(59)), "< 1m");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }

    if parts.is_empty() {
        "< 1m".to_string()
    } else {
        parts.join(" ")
    }
}

/// `format_duration` for an optional figure; `Unknown` when absent.
pub fn format_uptime(uptime: Option<Duration>) -> String {
    match uptime {
        Some(d) => format_duration(d),
        None => "Unknown".to_string(),
    }
}
