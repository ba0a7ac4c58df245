use crate::reduce::MembershipSnapshot;

/// Direction of a single membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Joined,
    Left,
}

/// One join or leave difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDelta {
    pub group: String,
    pub user: String,
    pub kind: DeltaKind,
}

impl MembershipDelta {
    fn joined(group: &str, user: &str) -> Self {
        MembershipDelta {
            group: group.to_string(),
            user: user.to_string(),
            kind: DeltaKind::Joined,
        }
    }

    fn left(group: &str, user: &str) -> Self {
        MembershipDelta {
            group: group.to_string(),
            user: user.to_string(),
            kind: DeltaKind::Left,
        }
    }
}

/// Compare two snapshots and report every membership change.
///
/// A member of `current` absent from the same room in `previous` (or whose
/// room did not exist in `previous`) yields a `Joined` delta; a member of
/// `previous` absent from `current` yields a `Left` delta. Unchanged rooms
/// contribute nothing.
///
/// Pure comparison; dispatching notifications belongs to the sinks
/// downstream. Output order is deterministic: all joins first, then all
/// leaves, rooms in name order, members in join order.
///
/// # Examples
///
/// ```
/// use roomwatch::{diff, parse_line, reduce, DeltaKind};
///
/// let before = reduce([parse_line(",GroupJoin,Jam,alice")]);
/// let after = reduce([
///     parse_line(",GroupJoin,Jam,alice"),
///     parse_line(",GroupJoin,Jam,bob"),
/// ]);
///
/// let deltas = diff(&before, &after);
/// assert_eq!(deltas.len(), 1);
/// assert_eq!(deltas[0].user, "bob");
/// assert_eq!(deltas[0].kind, DeltaKind::Joined);
/// ```
pub fn diff(previous: &MembershipSnapshot, current: &MembershipSnapshot) -> Vec<MembershipDelta> {
    let mut deltas = Vec::new();

    for (group, members) in current.groups() {
        for user in members {
            if !previous.contains(group, user) {
                deltas.push(MembershipDelta::joined(group, user));
            }
        }
    }

    for (group, members) in previous.groups() {
        for user in members {
            if !current.contains(group, user) {
                deltas.push(MembershipDelta::left(group, user));
            }
        }
    }

    deltas
}
