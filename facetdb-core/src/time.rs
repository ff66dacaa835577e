//! Time handling for the query layer

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FacetError, FacetResult};

/// Timestamp representing a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The Unix epoch
    pub fn epoch() -> Self {
        Self(DateTime::UNIX_EPOCH)
    }

    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> FacetResult<Self> {
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(FacetError::time_range(format!(
                "Invalid timestamp: {}",
                millis
            ))),
        }
    }

    /// Create from a DateTime<Utc>
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Get the underlying DateTime<Utc>
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as ISO 8601 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Parse from ISO 8601 string
    pub fn from_rfc3339(s: &str) -> FacetResult<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| FacetError::time_range(format!("Invalid RFC3339 timestamp: {}", e)))?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Add duration in milliseconds
    pub fn add_millis(&self, millis: i64) -> FacetResult<Self> {
        let duration = chrono::Duration::milliseconds(millis);
        self.0
            .checked_add_signed(duration)
            .map(Self)
            .ok_or_else(|| FacetError::time_range("Timestamp overflow".to_string()))
    }
}

impl std::hash::Hash for Timestamp {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.timestamp_millis().hash(state);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Queried time window: inclusive start, optional inclusive end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: Timestamp,
    pub end: Option<Timestamp>,
}

impl QueryWindow {
    /// Create a new window, rejecting an end before the start
    pub fn new(start: Timestamp, end: Option<Timestamp>) -> FacetResult<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(FacetError::time_range(
                    "End time must not be before start time".to_string(),
                ));
            }
        }
        Ok(Self { start, end })
    }

    /// Create an open-ended window
    pub fn since(start: Timestamp) -> Self {
        Self { start, end: None }
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        if timestamp < self.start {
            return false;
        }
        match self.end {
            Some(end) => timestamp <= end,
            None => true,
        }
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{} - {}]", self.start, end),
            None => write!(f, "[{} - ...]", self.start),
        }
    }
}
