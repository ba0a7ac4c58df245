//! The shared poll pipeline: fetch → parse → reduce → diff → persist.

use crate::delta::{MembershipDelta, diff};
use crate::event::parse_line;
use crate::reduce::{MembershipSnapshot, reduce};
use crate::source::{LogWindowSource, MONITOR_WINDOW, SourceError};
use crate::state::StateStore;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Upper bound on one log fetch, so a hung source delays only its own task's
/// next tick instead of starving the shared critical section.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("log fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of one advancing poll cycle.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// The freshly reduced snapshot of the visible window.
    pub snapshot: MembershipSnapshot,
    /// Changes relative to the previously published snapshot.
    pub deltas: Vec<MembershipDelta>,
}

/// One source, one store, shared by every scheduled task.
///
/// The fetch runs outside the store lock (it is the slow external call);
/// compute, diff and persist then happen inside a single critical section,
/// so concurrent tasks can never interleave reads and writes in a way that
/// loses an update.
pub struct Monitor<S> {
    source: S,
    store: Mutex<StateStore>,
    window: usize,
}

impl<S: LogWindowSource> Monitor<S> {
    pub fn new(source: S, store: StateStore) -> Self {
        Monitor {
            source,
            store: Mutex::new(store),
            window: MONITOR_WINDOW,
        }
    }

    /// Override the monitoring window size (default [`MONITOR_WINDOW`]).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn snapshot_from_window(&self) -> Result<MembershipSnapshot, PollError> {
        let lines = timeout(FETCH_TIMEOUT, self.source.fetch(self.window))
            .await
            .map_err(|_| PollError::Timeout(FETCH_TIMEOUT))??;
        Ok(reduce(lines.iter().map(|line| parse_line(line))))
    }

    /// Run one advancing cycle: reduce the current window, diff it against
    /// the published snapshot, and persist the new snapshot when it differs.
    ///
    /// Exactly one task in a process should advance the store; everyone
    /// else reads via [`observe`](Self::observe), otherwise deltas get
    /// consumed by whichever task happens to poll first.
    pub async fn poll(&self) -> Result<PollOutcome, PollError> {
        let snapshot = self.snapshot_from_window().await?;

        let mut store = self.store.lock().await;
        let deltas = diff(store.snapshot(), &snapshot);
        if *store.snapshot() != snapshot {
            store.replace_snapshot(snapshot.clone());
        }

        Ok(PollOutcome { snapshot, deltas })
    }

    /// Reduce the current window without touching the published snapshot.
    pub async fn observe(&self) -> Result<MembershipSnapshot, PollError> {
        self.snapshot_from_window().await
    }

    /// The snapshot last published (what the outside world currently sees).
    pub async fn published_snapshot(&self) -> MembershipSnapshot {
        self.store.lock().await.snapshot().clone()
    }

    pub async fn display_handle(&self) -> Option<String> {
        self.store
            .lock()
            .await
            .display_handle()
            .map(str::to_string)
    }

    pub async fn set_display_handle(&self, handle: Option<String>) {
        self.store.lock().await.set_display_handle(handle);
    }
}
