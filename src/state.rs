//! Durable holder of the last-published snapshot and display handle.

use crate::reduce::MembershipSnapshot;
use fs2::FileExt;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// What survives a process restart: the snapshot last published to the
/// outside world, and the opaque handle of the pinned display message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub snapshot: MembershipSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,
}

/// On-disk envelope: the state plus an xxh64 checksum of its serialized
/// form. A mismatch on load means the file was truncated or hand-edited and
/// is treated the same as a missing file.
#[derive(Serialize, Deserialize)]
struct StateFile {
    state: PersistedState,
    hash: String,
}

fn state_hash(state: &PersistedState) -> String {
    // Field order is fixed and the snapshot map is ordered, so the
    // serialization is canonical.
    let json = serde_json::to_string(state).unwrap_or_default();
    let hash = xxhash_rust::xxh64::xxh64(json.as_bytes(), 0);
    format!("{hash:016x}")
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state directory unavailable: {0}")]
    Io(#[from] io::Error),
    #[error("another process holds the state lock at {path}")]
    Locked { path: PathBuf },
}

/// The single authoritative holder of [`PersistedState`] for a process.
///
/// `open` takes an exclusive advisory lock next to the state file, so a
/// second monitor pointed at the same file fails at startup instead of the
/// two silently overwriting each other. Loading is infallible for the
/// caller: a missing, unreadable, corrupt, or checksum-mismatched file
/// yields empty defaults plus a logged warning. Saving is atomic
/// (tmp + sync + rename) and best-effort: a failed write is logged as an
/// error and the in-memory state stays authoritative until the next
/// successful write.
pub struct StateStore {
    path: PathBuf,
    state: PersistedState,
    _lock: File,
}

impl StateStore {
    /// Open the store, acquiring the process lock and loading whatever state
    /// survives on disk.
    ///
    /// # Errors
    ///
    /// Fails only when the lock cannot be taken (another instance is
    /// running) or the state directory cannot be created. Both are startup
    /// conditions, never poll-cycle ones.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| StateError::Locked { path: lock_path })?;

        let state = load(&path);
        Ok(StateStore {
            path,
            state,
            _lock: lock,
        })
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// The snapshot last published (empty after a fresh start).
    pub fn snapshot(&self) -> &MembershipSnapshot {
        &self.state.snapshot
    }

    pub fn display_handle(&self) -> Option<&str> {
        self.state.display_handle.as_deref()
    }

    /// Replace the published snapshot and flush to disk.
    pub fn replace_snapshot(&mut self, snapshot: MembershipSnapshot) {
        self.state.snapshot = snapshot;
        self.persist();
    }

    /// Record a new display handle. Flushes only when the handle actually
    /// changed.
    pub fn set_display_handle(&mut self, handle: Option<String>) {
        if self.state.display_handle != handle {
            self.state.display_handle = handle;
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.write_file() {
            error!("failed to save state to {}: {e}", self.path.display());
        }
    }

    /// Write to a `.tmp` file, sync, then rename over the final path. If the
    /// process dies mid-write the previous state file survives intact.
    fn write_file(&self) -> io::Result<()> {
        let envelope = StateFile {
            state: self.state.clone(),
            hash: state_hash(&self.state),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_data()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn load(path: &Path) -> PersistedState {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no previous state at {}, starting fresh", path.display());
            return PersistedState::default();
        }
        Err(e) => {
            warn!("cannot read state file {}: {e}", path.display());
            return PersistedState::default();
        }
    };

    let envelope: StateFile = match serde_json::from_str(&contents) {
        Ok(f) => f,
        Err(e) => {
            warn!(
                "state file {} is corrupt ({e}), starting fresh",
                path.display()
            );
            return PersistedState::default();
        }
    };

    if envelope.hash != state_hash(&envelope.state) {
        warn!(
            "state file {} failed its checksum, starting fresh",
            path.display()
        );
        return PersistedState::default();
    }

    envelope.state
}
