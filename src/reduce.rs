use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inferred membership state: room name → members in join order.
///
/// Invariants maintained by [`apply`]:
///
/// - every room present in the mapping has at least one member; a room is
///   deleted the moment its last member leaves;
/// - members are unique within a room, in first-join order (the order is what
///   makes display trimming stable).
///
/// Serializes as a plain JSON object (`{"Jam": ["alice", "bob"]}`), which is
/// also the shape it takes inside the persisted state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSnapshot {
    groups: BTreeMap<String, Vec<String>>,
}

impl MembershipSnapshot {
    /// An empty snapshot: no rooms, no members.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate rooms in name order, each with its members in join order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(g, m)| (g.as_str(), m.as_slice()))
    }

    /// Members of one room, in join order. `None` if the room has no members
    /// (empty rooms never exist in a snapshot).
    pub fn members(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Whether `user` is currently in `group`.
    pub fn contains(&self, group: &str, user: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.iter().any(|m| m == user))
    }

    /// Number of active rooms.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total member entries across all rooms. A user sitting in two rooms
    /// counts twice, matching what the display surfaces show.
    pub fn user_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// True when no rooms are active.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Fold one event into a snapshot. Pure: owned state in, owned state out.
///
/// - `GroupJoin` appends the user to the room, creating it if needed;
///   duplicate joins are idempotent.
/// - `GroupLeave` removes the user from the room and prunes the room if that
///   emptied it. A leave for a pair that is not joined has no effect.
/// - `UserJoin` is a no-op: the room assignment always follows in its own
///   `GroupJoin` record.
/// - `UserLeave` removes the user from every room, pruning any room that
///   empties. Removal is independent per room, so iteration order cannot
///   change the result.
/// - `Unrecognized` is a no-op.
///
/// # Examples
///
/// ```
/// use roomwatch::{apply, Event, MembershipSnapshot};
///
/// let snap = apply(
///     MembershipSnapshot::new(),
///     &Event::GroupJoin { group: "Jam".into(), user: "alice".into() },
/// );
/// assert_eq!(snap.members("Jam"), Some(&["alice".to_string()][..]));
/// ```
pub fn apply(mut snapshot: MembershipSnapshot, event: &Event) -> MembershipSnapshot {
    match event {
        Event::GroupJoin { group, user } => {
            let members = snapshot.groups.entry(group.clone()).or_default();
            if !members.iter().any(|m| m == user) {
                members.push(user.clone());
            }
        }
        Event::GroupLeave { group, user } => {
            if let Some(members) = snapshot.groups.get_mut(group) {
                members.retain(|m| m != user);
                if members.is_empty() {
                    snapshot.groups.remove(group);
                }
            }
        }
        Event::UserLeave { user } => {
            snapshot.groups.retain(|_, members| {
                members.retain(|m| m != user);
                !members.is_empty()
            });
        }
        Event::UserJoin { .. } | Event::Unrecognized => {}
    }
    snapshot
}

/// Fold an ordered event sequence into a snapshot, starting from empty.
///
/// This is a full recompute: the visible log window is treated as
/// authoritative and nothing carries over from previous polls, which makes
/// every cycle self-healing against missed or dropped records. The result
/// depends only on the event order: re-running on the same window yields an
/// identical snapshot.
///
/// Known structural limitation: the window is bounded to the most recent N
/// lines, so a user whose join has scrolled out of the window (and who has
/// not yet left) is absent from the snapshot even though they are still
/// connected. True state would need an unbounded or checkpointed log view.
///
/// # Examples
///
/// ```
/// use roomwatch::{parse_line, reduce};
///
/// let lines = [
///     "1712000000.1,5,1,GroupJoin,Jam,alice",
///     "1712000003.2,6,1,GroupJoin,Jam,bob",
///     "1712000009.0,7,1,UserLeave,alice",
/// ];
/// let snap = reduce(lines.iter().map(|l| parse_line(l)));
/// assert_eq!(snap.members("Jam"), Some(&["bob".to_string()][..]));
/// ```
pub fn reduce<I>(events: I) -> MembershipSnapshot
where
    I: IntoIterator<Item = Event>,
{
    events
        .into_iter()
        .fold(MembershipSnapshot::new(), |snapshot, event| {
            apply(snapshot, &event)
        })
}
