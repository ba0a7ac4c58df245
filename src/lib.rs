//! roomwatch: infer live room membership from a server's log tail.
//!
//! The monitored collaboration server keeps no queryable roster; the only
//! record of who is in which room is its append-only event log. This crate
//! reconstructs the current membership as a fold over the most recent
//! window of that log, diffs it against the previously published state, and
//! republishes the result on independent timers: a pinned status display, a
//! join/leave notification stream, a presence line and a user counter.
//!
//! The pipeline per poll is `fetch → parse → reduce → diff → persist`. The
//! reduction is a full recompute of the visible window each cycle; nothing
//! incremental carries across polls, which makes every cycle self-healing at
//! the cost of a window-bounded view (see [`reduce`]).

pub mod config;
pub mod delta;
pub mod discord;
pub mod event;
pub mod monitor;
pub mod probe;
pub mod reduce;
pub mod report;
pub mod sched;
pub mod sink;
pub mod source;
pub mod state;

pub use delta::{DeltaKind, MembershipDelta, diff};
pub use event::{Event, parse_line};
pub use monitor::{Monitor, PollOutcome};
pub use reduce::{MembershipSnapshot, apply, reduce};
pub use state::{PersistedState, StateStore};
