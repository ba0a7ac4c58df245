//! Outbound boundaries: where inferred state gets republished.

use crate::delta::MembershipDelta;
use crate::report::{PresenceSummary, StatusReport};
use async_trait::async_trait;
use log::info;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api rejected the request with status {status}: {body}")]
    Api { status: u16, body: String },
    /// The target of an update (message, channel) no longer exists. Callers
    /// match on this to recreate the target rather than treating it as a
    /// transport failure.
    #[error("target not found")]
    NotFound,
}

/// Accepts a full status report and either updates an existing pinned
/// display or creates one. Returns the handle of whichever message now
/// carries the display, for the caller to persist.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    async fn publish(
        &self,
        report: &StatusReport,
        handle: Option<&str>,
    ) -> Result<String, SinkError>;
}

/// Emits one message per membership delta.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, deltas: &[MembershipDelta]) -> Result<(), SinkError>;
}

/// Updates an external "what's happening" indicator.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn publish(&self, summary: &PresenceSummary) -> Result<(), SinkError>;
}

/// Updates an external user-count indicator.
#[async_trait]
pub trait CounterSink: Send + Sync {
    async fn publish(&self, users: usize) -> Result<(), SinkError>;
}

/// Presence published to the process log. Gateway presence needs a live
/// gateway session, which sits outside this crate's boundary; embedders
/// with one implement [`PresenceSink`] against it instead.
pub struct LogPresenceSink;

#[async_trait]
impl PresenceSink for LogPresenceSink {
    async fn publish(&self, summary: &PresenceSummary) -> Result<(), SinkError> {
        if !summary.server_up {
            info!("presence: server offline");
        } else if summary.users > 0 {
            info!(
                "presence: {} user{} in {} room{}",
                summary.users,
                plural(summary.users),
                summary.groups,
                plural(summary.groups),
            );
        } else {
            info!("presence: waiting for connections");
        }
        Ok(())
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
