//! Storage contract shared by both repository variants
//!
//! The resource layer talks to one [`MetricStore`]; whether the rows come
//! from the time-series read API or the relational columnar store is a
//! deployment decision. Implementations own their connections and release
//! them on every exit path.

use async_trait::async_trait;

use crate::dimension::DimensionName;
use crate::error::FacetResult;
use crate::metric::MetricName;
use crate::page::{DimensionNameRecord, DimensionValueRecord, Page, PageRequest};
use crate::query::MeasurementQuery;
use crate::series::MeasurementSeries;
use crate::tenant::TenantId;

/// Read-path contract over one storage backend.
///
/// All three operations return deterministically ordered pages: repeated
/// calls with identical arguments against unchanged backend content return
/// identical output, and chaining each page's `next_offset` into the
/// following call walks the full result set without duplicates or gaps.
/// Failures propagate synchronously; nothing is retried here.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Discover dimension names attached to a metric (or to the whole
    /// catalog when `metric` is absent), ordered lexicographically by name.
    async fn find_dimension_names(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionNameRecord>>;

    /// Discover the values one dimension takes on a metric (or on the whole
    /// catalog when `metric` is absent), ordered lexicographically by value.
    async fn find_dimension_values(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        dimension: &DimensionName,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionValueRecord>>;

    /// Execute a measurement query: filter, group or merge, and paginate
    /// rows into ordered series.
    async fn find_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> FacetResult<Page<MeasurementSeries>>;
}
