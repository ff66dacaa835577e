//! Metric name type and validation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FacetError, FacetResult};

/// Metric name - a string identifier for a measured quantity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Create a new metric name
    pub fn new<S: Into<String>>(name: S) -> FacetResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(FacetError::validation("Metric name cannot be empty"));
        }

        if name.len() > crate::MAX_METRIC_NAME_LENGTH {
            return Err(FacetError::validation(format!(
                "Metric name too long: {} > {}",
                name.len(),
                crate::MAX_METRIC_NAME_LENGTH
            )));
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(FacetError::validation(
                "Metric name contains invalid characters",
            ));
        }

        Ok(Self(name))
    }

    /// Create without validation (for internal use)
    pub(crate) fn new_unchecked<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the metric name is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MetricName {
    fn from(s: String) -> Self {
        let s_clone = s.clone();
        Self::new(s).unwrap_or_else(|_| Self::new_unchecked(s_clone))
    }
}

impl From<&str> for MetricName {
    fn from(s: &str) -> Self {
        Self::new(s).unwrap_or_else(|_| Self::new_unchecked(s))
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MetricName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MetricName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for MetricName {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}
