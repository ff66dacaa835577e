//! Backend selection
//!
//! One tagged variant per storage backend, both implementing the identical
//! external contract; `main` holds a single concrete value chosen from
//! configuration and shares no state between the cases.

use async_trait::async_trait;
use tracing::info;

use facetdb_core::dimension::DimensionName;
use facetdb_core::error::FacetResult;
use facetdb_core::metric::MetricName;
use facetdb_core::page::{DimensionNameRecord, DimensionValueRecord, Page, PageRequest};
use facetdb_core::query::MeasurementQuery;
use facetdb_core::series::MeasurementSeries;
use facetdb_core::store::MetricStore;
use facetdb_core::tenant::TenantId;

use crate::config::{BackendKind, QueryServiceConfig};
use crate::relational::RelationalRepository;
use crate::timeseries::TimeSeriesRepository;

/// The configured storage backend
pub enum Repository {
    TimeSeries(TimeSeriesRepository),
    Relational(RelationalRepository),
}

impl Repository {
    /// Construct the backend named by the configuration
    pub async fn connect(config: &QueryServiceConfig) -> FacetResult<Self> {
        match config.backend {
            BackendKind::TimeSeries => {
                info!(
                    base_url = %config.timeseries.base_url,
                    database = %config.timeseries.database,
                    "using time-series backend"
                );
                Ok(Repository::TimeSeries(TimeSeriesRepository::connect(
                    &config.timeseries,
                )?))
            }
            BackendKind::Relational => {
                info!(url = %config.relational.url, "using relational backend");
                Ok(Repository::Relational(
                    RelationalRepository::connect(&config.relational).await?,
                ))
            }
        }
    }

    fn store(&self) -> &dyn MetricStore {
        match self {
            Repository::TimeSeries(repository) => repository,
            Repository::Relational(repository) => repository,
        }
    }
}

#[async_trait]
impl MetricStore for Repository {
    async fn find_dimension_names(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionNameRecord>> {
        self.store().find_dimension_names(tenant, metric, page).await
    }

    async fn find_dimension_values(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        dimension: &DimensionName,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionValueRecord>> {
        self.store()
            .find_dimension_values(tenant, metric, dimension, page)
            .await
    }

    async fn find_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> FacetResult<Page<MeasurementSeries>> {
        self.store().find_measurements(query).await
    }
}
