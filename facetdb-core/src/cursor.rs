//! Opaque continuation cursors
//!
//! A cursor marks the last item already delivered; the next page contains
//! only items strictly after it. Callers round-trip the encoded string and
//! never construct one themselves.

use std::fmt;

use crate::error::{FacetError, FacetResult};
use crate::time::Timestamp;

/// Separates timestamp and group identity in the encoded composite form.
/// The split is on the first occurrence, so group identities may contain
/// any character including the separator.
const COMPOSITE_SEPARATOR: char = '@';

/// Continuation cursor for measurement pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Bare last-seen timestamp; used when results form a single series
    Timestamp(Timestamp),
    /// Last-seen group identity plus timestamp within that group; required
    /// whenever results are grouped, because a timestamp alone does not
    /// disambiguate across groups
    Composite { group: String, timestamp: Timestamp },
}

impl Cursor {
    /// The timestamp component of either form
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Cursor::Timestamp(ts) => *ts,
            Cursor::Composite { timestamp, .. } => *timestamp,
        }
    }

    /// Encode to the wire form: `<millis>` or `<millis>@<group>`
    pub fn encode(&self) -> String {
        match self {
            Cursor::Timestamp(ts) => ts.timestamp_millis().to_string(),
            Cursor::Composite { group, timestamp } => format!(
                "{}{}{}",
                timestamp.timestamp_millis(),
                COMPOSITE_SEPARATOR,
                group
            ),
        }
    }

    /// Parse a wire-form cursor. `composite` states which form the current
    /// grouping mode requires; the other form is rejected rather than
    /// guessed at.
    pub fn parse(s: &str, composite: bool) -> FacetResult<Self> {
        if composite {
            let (millis, group) = s.split_once(COMPOSITE_SEPARATOR).ok_or_else(|| {
                FacetError::cursor(format!(
                    "Grouped query requires a composite cursor, got '{}'",
                    s
                ))
            })?;
            Ok(Cursor::Composite {
                group: group.to_string(),
                timestamp: parse_millis(millis)?,
            })
        } else {
            Ok(Cursor::Timestamp(parse_millis(s)?))
        }
    }

    /// Whether a row at (`group`, `timestamp`) lies strictly after this
    /// cursor. Ungrouped rows pass the empty string as their group.
    pub fn admits(&self, group: &str, timestamp: Timestamp) -> bool {
        match self {
            Cursor::Timestamp(cursor_ts) => timestamp > *cursor_ts,
            Cursor::Composite {
                group: cursor_group,
                timestamp: cursor_ts,
            } => {
                group > cursor_group.as_str()
                    || (group == cursor_group.as_str() && timestamp > *cursor_ts)
            }
        }
    }
}

fn parse_millis(s: &str) -> FacetResult<Timestamp> {
    let millis: i64 = s
        .parse()
        .map_err(|_| FacetError::cursor(format!("Invalid cursor timestamp: '{}'", s)))?;
    Timestamp::from_millis(millis)
        .map_err(|_| FacetError::cursor(format!("Cursor timestamp out of range: {}", millis)))
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
