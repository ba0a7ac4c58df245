mod common;

use chrono::Utc;
use common::{snap, test_probes};
use roomwatch::report::{self, format_duration, format_uptime, StatusReport};
use roomwatch::probe::{ResourceStats, ServiceStatus, UptimeInfo};
use std::time::Duration;

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_secs(0)), "< 1m");
    assert_eq!(format_duration(Duration::from_secs(59)), "< 1m");
    assert_eq!(format_duration(Duration::from_secs(60)), "1m");
    assert_eq!(format_duration(Duration::from_secs(3_600)), "1h");
    assert_eq!(format_duration(Duration::from_secs(3_660)), "1h 1m");
    assert_eq!(format_duration(Duration::from_secs(90_180)), "1d 1h 3m");
    // Zero components in the middle are omitted, not rendered as 0h.
    assert_eq!(format_duration(Duration::from_secs(86_400 + 120)), "1d 2m");
}

#[test]
fn test_format_uptime_unknown() {
    assert_eq!(format_uptime(None), "Unknown");
    assert_eq!(format_uptime(Some(Duration::from_secs(60))), "1m");
}

#[test]
fn test_summary_counts_per_room_entries() {
    // alice sits in two rooms and counts twice, matching the display.
    let report = StatusReport {
        snapshot: snap(&[("Jam", &["alice", "bob"]), ("Mix", &["alice"])]),
        service: ServiceStatus {
            active: true,
            pid: Some(1),
        },
        connections: 2,
        stats: ResourceStats::default(),
        uptime: UptimeInfo::default(),
        generated_at: Utc::now(),
    };

    let summary = report.summary();
    assert_eq!(summary.users, 3);
    assert_eq!(summary.groups, 2);
    assert!(summary.server_up);
}

#[tokio::test]
async fn test_gather_uses_probes() {
    let probes = test_probes();
    let report = report::gather(snap(&[("Jam", &["alice"])]), &probes).await;

    assert!(report.service.active);
    assert_eq!(report.connections, 3);
    assert_eq!(report.stats, ResourceStats::default());
    assert_eq!(report.snapshot, snap(&[("Jam", &["alice"])]));
}
