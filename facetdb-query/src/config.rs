//! Configuration for the query service

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Which storage backend serves this deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    TimeSeries,
    Relational,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::TimeSeries => "timeseries",
            BackendKind::Relational => "relational",
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "timeseries" => Ok(BackendKind::TimeSeries),
            "relational" => Ok(BackendKind::Relational),
            other => Err(anyhow::anyhow!("Unknown backend '{}'", other)),
        }
    }
}

/// Configuration for the query service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Deployment region reported on the health endpoint
    pub region: String,

    /// Which backend this deployment reads from
    pub backend: BackendKind,

    /// Time-series backend settings (used when backend = timeseries)
    pub timeseries: TimeSeriesSettings,

    /// Relational backend settings (used when backend = relational)
    pub relational: RelationalSettings,

    /// Pagination and slow-query limits
    pub limits: LimitsSettings,
}

/// Time-series read API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesSettings {
    /// Base URL of the read API
    pub base_url: String,

    /// Database to query
    pub database: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Relational store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalSettings {
    /// Postgres connection URL
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Measurements table name
    pub measurements_table: String,

    /// Definitions side-table name
    pub definitions_table: String,
}

/// Pagination and slow-query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Page size applied when the caller sends no limit
    pub default_limit: usize,

    /// Hard upper bound a caller-supplied limit is clamped to
    pub max_limit: usize,

    /// Threshold for the slow-query counter, in milliseconds
    pub slow_query_ms: u64,
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            region: "local".to_string(),
            backend: BackendKind::TimeSeries,
            timeseries: TimeSeriesSettings::default(),
            relational: RelationalSettings::default(),
            limits: LimitsSettings::default(),
        }
    }
}

impl Default for TimeSeriesSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8086".to_string(),
            database: "facetdb".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for RelationalSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/facetdb".to_string(),
            max_connections: 8,
            measurements_table: "measurements".to_string(),
            definitions_table: "metric_definitions".to_string(),
        }
    }
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            default_limit: 25,
            max_limit: 1000,
            slow_query_ms: 1000,
        }
    }
}

impl QueryServiceConfig {
    /// Load configuration from environment variables and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bind_address) = env::var("FACETDB_QUERY_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Ok(region) = env::var("FACETDB_REGION") {
            config.region = region;
        }
        if let Ok(backend) = env::var("FACETDB_BACKEND") {
            config.backend = backend.parse()?;
        }

        if let Ok(base_url) = env::var("FACETDB_TS_URL") {
            config.timeseries.base_url = base_url;
        }
        if let Ok(database) = env::var("FACETDB_TS_DATABASE") {
            config.timeseries.database = database;
        }
        if let Ok(timeout_ms) = env::var("FACETDB_TS_TIMEOUT_MS") {
            config.timeseries.timeout_ms = timeout_ms.parse()?;
        }

        if let Ok(url) = env::var("FACETDB_SQL_URL") {
            config.relational.url = url;
        }
        if let Ok(max_connections) = env::var("FACETDB_SQL_MAX_CONNS") {
            config.relational.max_connections = max_connections.parse()?;
        }

        if let Ok(default_limit) = env::var("FACETDB_DEFAULT_LIMIT") {
            config.limits.default_limit = default_limit.parse()?;
        }
        if let Ok(max_limit) = env::var("FACETDB_MAX_LIMIT") {
            config.limits.max_limit = max_limit.parse()?;
        }
        if let Ok(slow_query_ms) = env::var("FACETDB_SLOW_QUERY_MS") {
            config.limits.slow_query_ms = slow_query_ms.parse()?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(anyhow::anyhow!("Bind address cannot be empty"));
        }
        if self.region.is_empty() {
            return Err(anyhow::anyhow!("Region cannot be empty"));
        }
        if self.limits.default_limit == 0 {
            return Err(anyhow::anyhow!("Default limit must be greater than 0"));
        }
        if self.limits.max_limit < self.limits.default_limit {
            return Err(anyhow::anyhow!(
                "Max limit must be at least the default limit"
            ));
        }

        match self.backend {
            BackendKind::TimeSeries => {
                if self.timeseries.base_url.is_empty() {
                    return Err(anyhow::anyhow!("Time-series base URL cannot be empty"));
                }
                if self.timeseries.database.is_empty() {
                    return Err(anyhow::anyhow!("Time-series database cannot be empty"));
                }
            }
            BackendKind::Relational => {
                if self.relational.url.is_empty() {
                    return Err(anyhow::anyhow!("Relational URL cannot be empty"));
                }
                if self.relational.max_connections == 0 {
                    return Err(anyhow::anyhow!("Max connections must be greater than 0"));
                }
                for table in [
                    &self.relational.measurements_table,
                    &self.relational.definitions_table,
                ] {
                    if !is_identifier(table) {
                        return Err(anyhow::anyhow!("Invalid table name '{}'", table));
                    }
                }
            }
        }

        Ok(())
    }

    /// Clamp a caller-supplied limit into the configured bounds
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.limits.default_limit)
            .clamp(1, self.limits.max_limit)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
