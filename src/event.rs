/// A single classified record from the server's log tail.
///
/// The collaboration server emits comma-delimited operational records of the
/// shape `timestamp,id,id2,EventType,field...`. Only four record shapes carry
/// membership information; everything else in the feed (startup banners,
/// relay statistics, unrelated journal lines) classifies as
/// [`Unrecognized`](Event::Unrecognized) and is dropped by the reducer.
///
/// Events are immutable once parsed.
///
/// # Examples
///
/// ```
/// use roomwatch::{parse_line, Event};
///
/// let line = "1712000000.412,19,4,GroupJoin,Jam,alice 10.0.0.7:4242";
/// assert_eq!(
///     parse_line(line),
///     Event::GroupJoin { group: "Jam".to_string(), user: "alice".to_string() }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A user entered a room.
    GroupJoin { group: String, user: String },
    /// A user left one room (but may remain connected elsewhere).
    GroupLeave { group: String, user: String },
    /// A user connected to the server. Carries no room; the room assignment
    /// always arrives in a following `GroupJoin` for the same user, so the
    /// reducer treats this as a no-op.
    UserJoin { user: String },
    /// A user disconnected entirely; applies to every room containing them.
    UserLeave { user: String },
    /// Anything the grammar does not recognize. Dropped, never an error.
    Unrecognized,
}

/// Classify one raw log line into an [`Event`].
///
/// Recognition is by literal marker substring (`,GroupJoin,`, `,GroupLeave,`,
/// `,UserJoin,`, `,UserLeave,`; first marker in that order wins), followed
/// by comma-delimited fields. A field value is a non-empty run of non-comma,
/// non-whitespace characters; whatever trails a captured field on the line is
/// ignored.
///
/// The feed is append-only operational text, not a trusted protocol: a line
/// matching no marker, or matching a marker with missing or empty fields,
/// degrades to [`Event::Unrecognized`]. This function never fails.
///
/// # Examples
///
/// ```
/// use roomwatch::{parse_line, Event};
///
/// assert_eq!(
///     parse_line("1712000000.9,3,1,UserLeave,bob"),
///     Event::UserLeave { user: "bob".to_string() }
/// );
/// assert_eq!(parse_line("relay: forwarded 4096 bytes"), Event::Unrecognized);
/// assert_eq!(parse_line("1712000000.9,3,1,GroupJoin,"), Event::Unrecognized);
/// ```
pub fn parse_line(line: &str) -> Event {
    if let Some((_, rest)) = line.split_once(",GroupJoin,") {
        return group_event(rest, |group, user| Event::GroupJoin { group, user });
    }
    if let Some((_, rest)) = line.split_once(",GroupLeave,") {
        return group_event(rest, |group, user| Event::GroupLeave { group, user });
    }
    if let Some((_, rest)) = line.split_once(",UserJoin,") {
        return user_event(rest, |user| Event::UserJoin { user });
    }
    if let Some((_, rest)) = line.split_once(",UserLeave,") {
        return user_event(rest, |user| Event::UserLeave { user });
    }
    Event::Unrecognized
}

fn group_event(rest: &str, build: impl FnOnce(String, String) -> Event) -> Event {
    let Some((group, rest)) = take_token(rest) else {
        return Event::Unrecognized;
    };
    let Some(rest) = rest.strip_prefix(',') else {
        return Event::Unrecognized;
    };
    let Some((user, _)) = take_token(rest) else {
        return Event::Unrecognized;
    };
    build(group.to_string(), user.to_string())
}

fn user_event(rest: &str, build: impl FnOnce(String) -> Event) -> Event {
    match take_token(rest) {
        Some((user, _)) => build(user.to_string()),
        None => Event::Unrecognized,
    }
}

/// Take the leading field value: everything up to the first comma or
/// whitespace. Returns `None` for an empty value.
fn take_token(input: &str) -> Option<(&str, &str)> {
    let end = input
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(input.len());
    if end == 0 {
        None
    } else {
        Some((&input[..end], &input[end..]))
    }
}
