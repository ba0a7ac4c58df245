//! Host and service probes, all thin and best-effort.
//!
//! The monitor only needs enough here to decorate the status display:
//! whether the service is up, how many sockets are established, and rough
//! resource figures. Everything degrades gracefully: a probe that cannot
//! read its source reports zeros or `None`, never an aborted poll.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::time::Duration;
use tokio::process::Command;

/// Seconds-per-tick divisor for `/proc/<pid>/stat` CPU times (USER_HZ).
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Window for the two-point CPU utilization sample.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(200);

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("probe command exited with status {code:?}")]
    Command { code: Option<i32> },
}

/// Whether the monitored service is running, and under which pid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    pub active: bool,
    pub pid: Option<u32>,
}

/// Host and service uptime. `None` means the figure could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UptimeInfo {
    pub system: Option<Duration>,
    pub service: Option<Duration>,
}

/// Best-effort resource figures. Missing sources leave fields at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_available_gb: f64,
    pub disk_percent: f64,
    pub disk_free_gb: f64,
    pub network_sent_gb: f64,
    pub network_recv_gb: f64,
    /// CPU% of the monitored process itself.
    pub service_cpu_percent: f64,
    /// Resident set size of the monitored process, in MB.
    pub service_memory_mb: f64,
}

#[async_trait]
pub trait ServiceStatusProbe: Send + Sync {
    async fn status(&self) -> Result<ServiceStatus, ProbeError>;

    /// Best-effort uptimes; fields are `None` when unreadable.
    async fn uptime(&self) -> UptimeInfo;
}

#[async_trait]
pub trait ConnectionCounter: Send + Sync {
    /// Number of ESTABLISHED TCP connections on the service port.
    async fn established(&self) -> Result<usize, ProbeError>;
}

#[async_trait]
pub trait ResourceStatsProbe: Send + Sync {
    /// Sample resource usage. `service_pid` scopes the per-process figures.
    async fn sample(&self, service_pid: Option<u32>) -> ResourceStats;
}

/// All three probe boundaries bundled for the tasks that report on them.
pub struct Probes {
    pub service: Box<dyn ServiceStatusProbe>,
    pub connections: Box<dyn ConnectionCounter>,
    pub resources: Box<dyn ResourceStatsProbe>,
}

/// Asks systemd about the unit: `is-active` for liveness, `MainPID` and
/// `ActiveEnterTimestampMonotonic` from `systemctl show` for the rest.
pub struct SystemdProbe {
    unit: String,
}

impl SystemdProbe {
    pub fn new(unit: impl Into<String>) -> Self {
        SystemdProbe { unit: unit.into() }
    }

    async fn show_property(&self, property: &str) -> Result<String, ProbeError> {
        let output = Command::new("systemctl")
            .arg("show")
            .arg(&self.unit)
            .arg(format!("--property={property}"))
            .arg("--value")
            .output()
            .await?;
        if !output.status.success() {
            return Err(ProbeError::Command {
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ServiceStatusProbe for SystemdProbe {
    async fn status(&self) -> Result<ServiceStatus, ProbeError> {
        // `is-active` exits non-zero for inactive units; only failure to run
        // the command at all is an error here.
        let output = Command::new("systemctl")
            .arg("is-active")
            .arg(&self.unit)
            .output()
            .await?;
        let active = String::from_utf8_lossy(&output.stdout).trim() == "active";

        let pid = if active {
            self.show_property("MainPID")
                .await
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|&pid| pid != 0)
        } else {
            None
        };

        Ok(ServiceStatus { active, pid })
    }

    async fn uptime(&self) -> UptimeInfo {
        let system = system_uptime();

        // ActiveEnterTimestampMonotonic is microseconds on the monotonic
        // clock; the difference against current uptime is the service age.
        let service = match (system, self.show_property("ActiveEnterTimestampMonotonic").await) {
            (Some(up), Ok(value)) => value
                .parse::<u64>()
                .ok()
                .filter(|&micros| micros > 0)
                .map(|micros| up.saturating_sub(Duration::from_micros(micros))),
            _ => None,
        };

        UptimeInfo { system, service }
    }
}

fn system_uptime() -> Option<Duration> {
    let text = fs::read_to_string("/proc/uptime").ok()?;
    let seconds: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(Duration::from_secs_f64(seconds))
}

/// Counts ESTABLISHED sockets on one local port from `/proc/net/tcp` and
/// `/proc/net/tcp6`.
pub struct ProcConnectionCounter {
    port: u16,
}

impl ProcConnectionCounter {
    pub fn new(port: u16) -> Self {
        ProcConnectionCounter { port }
    }
}

#[async_trait]
impl ConnectionCounter for ProcConnectionCounter {
    async fn established(&self) -> Result<usize, ProbeError> {
        let mut count = 0;
        for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
            if let Ok(contents) = fs::read_to_string(table) {
                count += contents
                    .lines()
                    .skip(1)
                    .filter(|line| is_established_on(line, self.port))
                    .count();
            }
        }
        Ok(count)
    }
}

/// One `/proc/net/tcp` row: `sl local_address rem_address st ...` where
/// `local_address` is `HEXIP:HEXPORT` and `st` 01 means ESTABLISHED.
fn is_established_on(line: &str, port: u16) -> bool {
    let parse = || {
        let mut fields = line.split_whitespace();
        let _sl = fields.next()?;
        let local = fields.next()?;
        let _remote = fields.next()?;
        let state = fields.next()?;
        if state != "01" {
            return None;
        }
        let (_, port_hex) = local.rsplit_once(':')?;
        let local_port = u16::from_str_radix(port_hex, 16).ok()?;
        (local_port == port).then_some(())
    };
    parse().is_some()
}

/// Samples `/proc` for host figures and `fs2` for disk space.
pub struct ProcStatsProbe;

impl ProcStatsProbe {
    pub fn new() -> Self {
        ProcStatsProbe
    }
}

impl Default for ProcStatsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStatsProbe for ProcStatsProbe {
    async fn sample(&self, service_pid: Option<u32>) -> ResourceStats {
        let mut stats = ResourceStats::default();

        // Two-point sample for both host and process CPU over one window.
        let host_before = cpu_totals();
        let proc_before = service_pid.and_then(process_cpu_ticks);
        tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
        let host_after = cpu_totals();
        let proc_after = service_pid.and_then(process_cpu_ticks);

        if let (Some((busy0, total0)), Some((busy1, total1))) = (host_before, host_after) {
            let total = total1.saturating_sub(total0);
            if total > 0 {
                stats.cpu_percent = busy1.saturating_sub(busy0) as f64 / total as f64 * 100.0;
            }
        }

        if let (Some(t0), Some(t1)) = (proc_before, proc_after) {
            let seconds = t1.saturating_sub(t0) as f64 / CLOCK_TICKS_PER_SEC;
            stats.service_cpu_percent = seconds / CPU_SAMPLE_WINDOW.as_secs_f64() * 100.0;
        }

        if let Some((total_kb, available_kb)) = meminfo() {
            if total_kb > 0 {
                stats.memory_percent =
                    (total_kb.saturating_sub(available_kb)) as f64 / total_kb as f64 * 100.0;
            }
            stats.memory_available_gb = available_kb as f64 * 1024.0 / BYTES_PER_GB;
        }

        if let (Ok(total), Ok(available)) = (fs2::total_space("/"), fs2::available_space("/")) {
            if total > 0 {
                stats.disk_percent = total.saturating_sub(available) as f64 / total as f64 * 100.0;
            }
            stats.disk_free_gb = available as f64 / BYTES_PER_GB;
        }

        if let Some((rx, tx)) = net_totals() {
            stats.network_recv_gb = rx as f64 / BYTES_PER_GB;
            stats.network_sent_gb = tx as f64 / BYTES_PER_GB;
        }

        if let Some(rss) = service_pid.and_then(process_rss_bytes) {
            stats.service_memory_mb = rss as f64 / (1024.0 * 1024.0);
        }

        stats
    }
}

/// `(MemTotal, MemAvailable)` in kB from `/proc/meminfo`.
fn meminfo() -> Option<(u64, u64)> {
    let text = fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = None;
    let mut available_kb = None;
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest.split_whitespace().next().and_then(|v| v.parse().ok());
        match key {
            "MemTotal" => total_kb = value,
            "MemAvailable" => available_kb = value,
            _ => {}
        }
    }
    Some((total_kb?, available_kb?))
}

/// `(busy, total)` jiffies from the aggregate `cpu` line of `/proc/stat`.
fn cpu_totals() -> Option<(u64, u64)> {
    let text = fs::read_to_string("/proc/stat").ok()?;
    let line = text.lines().next()?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if values.len() < 4 {
        return None;
    }
    let total: u64 = values.iter().sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some((total.saturating_sub(idle), total))
}

/// utime + stime jiffies from `/proc/<pid>/stat`. The comm field may contain
/// spaces, so fields are counted from the closing paren.
fn process_cpu_ticks(pid: u32) -> Option<u64> {
    let text = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let after_comm = text.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // after the comm field: state is index 0, utime is index 11, stime 12
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// Resident set size in bytes from `/proc/<pid>/statm` (pages × 4096).
fn process_rss_bytes(pid: u32) -> Option<u64> {
    let text = fs::read_to_string(format!("/proc/{pid}/statm")).ok()?;
    let pages: u64 = text.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

/// Total `(received, sent)` bytes across interfaces from `/proc/net/dev`,
/// loopback excluded.
fn net_totals() -> Option<(u64, u64)> {
    let text = fs::read_to_string("/proc/net/dev").ok()?;
    let mut rx_total = 0u64;
    let mut tx_total = 0u64;
    for line in text.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        if name.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let rx: u64 = fields.first().and_then(|v| v.parse().ok()).unwrap_or(0);
        let tx: u64 = fields.get(8).and_then(|v| v.parse().ok()).unwrap_or(0);
        rx_total += rx;
        tx_total += tx;
    }
    Some((rx_total, tx_total))
}
