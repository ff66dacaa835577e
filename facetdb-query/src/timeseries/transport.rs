//! Backend reader for the time-series read API
//!
//! One round trip per call: hand the statement text to the HTTP endpoint,
//! get the raw response document back. No retries here; transport failures
//! propagate as backend errors and the client's own timeout is the only
//! cancellation contract.

use async_trait::async_trait;
use std::time::Duration;

use facetdb_core::error::{FacetError, FacetResult};

/// Executes free-form query text against the time-series backend and
/// returns the raw response document. Tests substitute an in-memory fake.
#[async_trait]
pub trait SeriesApi: Send + Sync {
    async fn query(&self, statement: &str) -> FacetResult<String>;
}

/// reqwest-backed client for the `GET /query` endpoint
pub struct HttpSeriesApi {
    client: reqwest::Client,
    base_url: String,
    database: String,
}

impl HttpSeriesApi {
    pub fn new(base_url: String, database: String, timeout_ms: u64) -> FacetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| FacetError::configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            database,
        })
    }
}

#[async_trait]
impl SeriesApi for HttpSeriesApi {
    async fn query(&self, statement: &str) -> FacetResult<String> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("db", self.database.as_str()), ("q", statement)])
            .send()
            .await
            .map_err(|e| FacetError::backend(format!("Time-series query failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FacetError::backend(format!("Time-series response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(FacetError::backend(format!(
                "Time-series backend returned {}: {}",
                status, body
            )));
        }
        Ok(body)
    }
}
