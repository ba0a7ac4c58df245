//! The log window boundary: where raw lines come from.

use async_trait::async_trait;
use std::io;
use tokio::process::Command;

/// Lines fetched per monitoring poll. The reduction treats this window as
/// authoritative, so it has to comfortably cover the churn between polls.
pub const MONITOR_WINDOW: usize = 500;

/// Hard cap on lines returned for user-facing log display, to prevent
/// flooding a chat channel.
pub const DISPLAY_TAIL_CAP: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to invoke log source: {0}")]
    Io(#[from] io::Error),
    #[error("log source exited with status {code:?}: {stderr}")]
    Command { code: Option<i32>, stderr: String },
}

/// Supplies the most recent bounded slice of the event log, oldest line
/// first, at most `max_lines` long.
#[async_trait]
pub trait LogWindowSource: Send + Sync {
    async fn fetch(&self, max_lines: usize) -> Result<Vec<String>, SourceError>;
}

/// Fetch a short tail for user-facing display, clamped to
/// [`DISPLAY_TAIL_CAP`] regardless of what the caller asked for.
pub async fn display_tail(
    source: &dyn LogWindowSource,
    requested: usize,
) -> Result<Vec<String>, SourceError> {
    source.fetch(requested.min(DISPLAY_TAIL_CAP)).await
}

/// Reads the tail of a systemd unit's journal via
/// `journalctl -u <unit> -n <lines> --no-pager`.
pub struct JournalSource {
    unit: String,
}

impl JournalSource {
    pub fn new(unit: impl Into<String>) -> Self {
        JournalSource { unit: unit.into() }
    }
}

#[async_trait]
impl LogWindowSource for JournalSource {
    async fn fetch(&self, max_lines: usize) -> Result<Vec<String>, SourceError> {
        let output = Command::new("journalctl")
            .arg("-u")
            .arg(&self.unit)
            .arg("-n")
            .arg(max_lines.to_string())
            .arg("--no-pager")
            .output()
            .await?;

        if !output.status.success() {
            return Err(SourceError::Command {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}
