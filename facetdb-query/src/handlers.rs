//! HTTP resource layer
//!
//! Thin translation between the wire and the [`MetricStore`] contract:
//! extract and validate parameters, clamp limits into configured bounds,
//! run the operation, and render the page plus its `nextOffset` link value.
//! Cursors pass through opaquely in both directions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error, warn};
use validator::Validate;

use facetdb_core::dimension::{DimensionName, DimensionSet};
use facetdb_core::error::FacetError;
use facetdb_core::metric::MetricName;
use facetdb_core::page::{Page, PageItem, PageRequest};
use facetdb_core::query::{GroupBy, MeasurementQuery};
use facetdb_core::store::MetricStore;
use facetdb_core::tenant::TenantId;
use facetdb_core::time::{QueryWindow, Timestamp};

use crate::metrics::{Operation, QueryTimer};
use crate::AppState;

type HandlerError = (StatusCode, Json<Value>);

/// Path value requesting a catalog-wide discovery scan
const METRIC_WILDCARD: &str = "*";

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "facetdb-query",
        "version": facetdb_core::VERSION,
        "region": state.config.region,
        "backend": state.config.backend.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    Ok(state.metrics.prometheus_format())
}

/// Dimension name discovery endpoint
pub async fn dimension_names_handler(
    State(state): State<AppState>,
    Path((tenant, metric)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, HandlerError> {
    debug!(tenant = %tenant, metric = %metric, "received dimension names query");

    let tenant = parse_tenant(&tenant)?;
    let metric = parse_metric_scope(&metric)?;
    let page = page_request(&state, &params)?;

    let timer = QueryTimer::start();
    match state
        .store
        .find_dimension_names(&tenant, metric.as_ref(), &page)
        .await
    {
        Ok(found) => {
            timer.finish(
                &state.metrics,
                Operation::DimensionNames,
                found.len(),
                state.config.limits.slow_query_ms,
            );
            Ok(Json(render_page(&found)))
        }
        Err(err) => {
            state.metrics.record_error();
            Err(error_response("Dimension name discovery failed", err))
        }
    }
}

/// Dimension value discovery endpoint
pub async fn dimension_values_handler(
    State(state): State<AppState>,
    Path((tenant, metric, dimension)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, HandlerError> {
    debug!(tenant = %tenant, metric = %metric, dimension = %dimension, "received dimension values query");

    let tenant = parse_tenant(&tenant)?;
    let metric = parse_metric_scope(&metric)?;
    let dimension = DimensionName::new_exposed(dimension).map_err(bad_request)?;
    let page = page_request(&state, &params)?;

    let timer = QueryTimer::start();
    match state
        .store
        .find_dimension_values(&tenant, metric.as_ref(), &dimension, &page)
        .await
    {
        Ok(found) => {
            timer.finish(
                &state.metrics,
                Operation::DimensionValues,
                found.len(),
                state.config.limits.slow_query_ms,
            );
            Ok(Json(render_page(&found)))
        }
        Err(err) => {
            state.metrics.record_error();
            Err(error_response("Dimension value discovery failed", err))
        }
    }
}

/// Measurement query request body
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MeasurementRequest {
    pub metric_name: Option<String>,
    #[serde(default)]
    pub dimension_filters: HashMap<String, String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub offset: Option<String>,
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
    #[serde(default)]
    pub merge_metrics: bool,
    #[serde(default)]
    pub group_by: Vec<String>,
}

/// Measurement query endpoint
pub async fn measurements_handler(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(payload): Json<MeasurementRequest>,
) -> Result<Json<Value>, HandlerError> {
    debug!(tenant = %tenant, "received measurement query: {:?}", payload);

    if let Err(err) = payload.validate() {
        warn!("Measurement request validation failed: {}", err);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "validation",
                "message": err.to_string()
            })),
        ));
    }

    let query = build_query(&state, &tenant, payload)?;

    let timer = QueryTimer::start();
    match state.store.find_measurements(&query).await {
        Ok(found) => {
            let rows: usize = found.items.iter().map(|series| series.len()).sum();
            timer.finish(
                &state.metrics,
                Operation::Measurements,
                rows,
                state.config.limits.slow_query_ms,
            );
            Ok(Json(render_page(&found)))
        }
        Err(err) => {
            state.metrics.record_error();
            Err(error_response("Measurement query failed", err))
        }
    }
}

fn build_query(
    state: &AppState,
    tenant: &str,
    payload: MeasurementRequest,
) -> Result<MeasurementQuery, HandlerError> {
    let tenant = parse_tenant(tenant)?;
    let metric = payload
        .metric_name
        .as_deref()
        .map(MetricName::new)
        .transpose()
        .map_err(bad_request)?;
    let filters = DimensionSet::from_map(payload.dimension_filters).map_err(bad_request)?;
    let window = QueryWindow::new(
        Timestamp::from_datetime(payload.start_time),
        payload.end_time.map(Timestamp::from_datetime),
    )
    .map_err(bad_request)?;
    let group_by = GroupBy::from_names(&payload.group_by).map_err(bad_request)?;

    Ok(MeasurementQuery {
        tenant,
        metric,
        filters,
        window,
        offset: payload.offset.filter(|s| !s.is_empty()),
        limit: state.config.effective_limit(payload.limit),
        group_by,
        merge_metrics: payload.merge_metrics,
    })
}

fn parse_tenant(tenant: &str) -> Result<TenantId, HandlerError> {
    TenantId::new(tenant).map_err(bad_request)
}

/// A `*` path segment scopes discovery to the whole catalog
fn parse_metric_scope(metric: &str) -> Result<Option<MetricName>, HandlerError> {
    if metric == METRIC_WILDCARD {
        return Ok(None);
    }
    MetricName::new(metric).map(Some).map_err(bad_request)
}

fn page_request(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<PageRequest, HandlerError> {
    // Zero is rejected, not clamped, matching the measurement body's
    // validation of its `limit` field
    let limit = match params.get("limit") {
        Some(raw) => match raw.parse::<usize>() {
            Ok(parsed) if parsed > 0 => Some(parsed),
            _ => {
                return Err(bad_request(FacetError::validation(format!(
                    "Invalid limit '{}'",
                    raw
                ))))
            }
        },
        None => None,
    };
    PageRequest::new(
        params.get("offset").cloned(),
        state.config.effective_limit(limit),
    )
    .map_err(bad_request)
}

/// Render a page as `results` plus, when truncated, the `nextOffset` the
/// caller round-trips into its next request
fn render_page<T: PageItem + serde::Serialize>(page: &Page<T>) -> Value {
    let mut body = json!({ "results": page.items });
    if let Some(next) = page.next_offset() {
        body["nextOffset"] = Value::String(next);
    }
    body
}

fn bad_request(err: FacetError) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": err.category(),
            "message": err.to_string()
        })),
    )
}

fn error_response(context: &str, err: FacetError) -> HandlerError {
    error!("{}: {}", context, err);
    let status = match err.category() {
        "ambiguous_metric" | "validation" | "cursor" | "time_range" => StatusCode::BAD_REQUEST,
        "backend" | "malformed_payload" | "io" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({
            "error": err.category(),
            "message": err.to_string()
        })),
    )
}
