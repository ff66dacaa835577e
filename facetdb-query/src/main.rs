use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use facetdb_query::metrics::QueryMetricsCollector;
use facetdb_query::{build_router, AppState, QueryServiceConfig, Repository};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load and validate configuration
    let config = Arc::new(QueryServiceConfig::load()?);
    config.validate()?;
    info!(
        region = %config.region,
        backend = config.backend.as_str(),
        "loaded configuration"
    );

    // Connect the configured storage backend
    let repository = Repository::connect(&config).await?;
    info!("initialized repository");

    let state = AppState {
        store: Arc::new(repository),
        config: config.clone(),
        metrics: Arc::new(QueryMetricsCollector::new()),
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    let addr = listener.local_addr()?;
    info!("FacetDB Query Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
