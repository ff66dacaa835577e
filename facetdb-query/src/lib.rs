//! FacetDB Query Service Library
//!
//! Components of the FacetDB read path: backend-specific query builders and
//! readers, result normalization, the grouping/merge engine, cursor
//! pagination, and the HTTP resource layer.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod grouping;
pub mod handlers;
pub mod metrics;
pub mod paging;
pub mod relational;
pub mod repository;
pub mod timeseries;

pub use config::QueryServiceConfig;
pub use repository::Repository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn facetdb_core::store::MetricStore>,
    pub config: Arc<QueryServiceConfig>,
    pub metrics: Arc<metrics::QueryMetricsCollector>,
}

/// Build the service router. Shared between `main` and the API tests so
/// both exercise the same routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/api/v1/tenants/:tenant/metrics/:metric/dimensions",
            get(handlers::dimension_names_handler),
        )
        .route(
            "/api/v1/tenants/:tenant/metrics/:metric/dimensions/:dimension/values",
            get(handlers::dimension_values_handler),
        )
        .route(
            "/api/v1/tenants/:tenant/measurements/query",
            post(handlers::measurements_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
