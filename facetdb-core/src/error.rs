//! Error types for FacetDB read-path operations

use thiserror::Error;

/// Result type for FacetDB read-path operations
pub type FacetResult<T> = Result<T, FacetError>;

/// Error taxonomy for the query layer
#[derive(Error, Debug)]
pub enum FacetError {
    /// A query without grouping or merge matched more than one metric
    /// definition. Client-correctable, never retried.
    #[error("Ambiguous metric: {0}")]
    AmbiguousMetric(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed backend payload: {0}")]
    MalformedPayload(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid cursor: {0}")]
    Cursor(String),

    #[error("Time range error: {0}")]
    TimeRange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FacetError {
    /// Create a new ambiguous-metric error
    pub fn ambiguous_metric<S: Into<String>>(message: S) -> Self {
        Self::AmbiguousMetric(message.into())
    }

    /// Create a new backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }

    /// Create a new malformed-payload error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new cursor error
    pub fn cursor<S: Into<String>>(message: S) -> Self {
        Self::Cursor(message.into())
    }

    /// Create a new time range error
    pub fn time_range<S: Into<String>>(message: S) -> Self {
        Self::TimeRange(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FacetError::AmbiguousMetric(_)
                | FacetError::Validation(_)
                | FacetError::Cursor(_)
                | FacetError::TimeRange(_)
        )
    }

    /// Check if this is a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(self, FacetError::Backend(_) | FacetError::Io(_))
    }

    /// Get the error category for monitoring/metrics
    pub fn category(&self) -> &'static str {
        match self {
            FacetError::AmbiguousMetric(_) => "ambiguous_metric",
            FacetError::Backend(_) => "backend",
            FacetError::MalformedPayload(_) => "malformed_payload",
            FacetError::Validation(_) => "validation",
            FacetError::Cursor(_) => "cursor",
            FacetError::TimeRange(_) => "time_range",
            FacetError::Configuration(_) => "configuration",
            FacetError::Internal(_) => "internal",
            FacetError::Io(_) => "io",
            FacetError::Json(_) => "malformed_payload",
        }
    }
}
