//! Time-series backend repository
//!
//! Implements the shared [`MetricStore`] contract on top of the series
//! read API. The backend cannot push composite cursor predicates down, so
//! cursor filtering and the limit+1 over-read run in-process through the
//! shared pagination engine.

pub mod builder;
pub mod normalize;
pub mod transport;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use facetdb_core::dimension::{DimensionName, DimensionSet};
use facetdb_core::error::FacetResult;
use facetdb_core::metric::MetricName;
use facetdb_core::page::{DimensionNameRecord, DimensionValueRecord, Page, PageRequest};
use facetdb_core::query::{group_key_of, GroupingMode, MeasurementQuery};
use facetdb_core::series::{KeyedRow, MeasurementSeries};
use facetdb_core::store::MetricStore;
use facetdb_core::tenant::TenantId;

use crate::config::TimeSeriesSettings;
use crate::grouping;
use crate::paging;
use transport::{HttpSeriesApi, SeriesApi};

/// Repository over the time-series read API
pub struct TimeSeriesRepository {
    api: Arc<dyn SeriesApi>,
}

impl TimeSeriesRepository {
    pub fn new(api: Arc<dyn SeriesApi>) -> Self {
        Self { api }
    }

    /// Build the HTTP-backed repository from configuration
    pub fn connect(settings: &TimeSeriesSettings) -> FacetResult<Self> {
        let api = HttpSeriesApi::new(
            settings.base_url.clone(),
            settings.database.clone(),
            settings.timeout_ms,
        )?;
        Ok(Self::new(Arc::new(api)))
    }

    async fn discover(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        dimension: Option<&DimensionName>,
    ) -> FacetResult<Vec<(MetricName, DimensionSet)>> {
        let statement = builder::show_series(tenant, metric, dimension);
        debug!(statement = %statement, "executing series discovery");

        let raw = self.api.query(&statement).await?;
        let series = normalize::parse_document(&raw)?;

        let mut entries = Vec::new();
        for one in &series {
            entries.extend(normalize::discovery_entries(one)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl MetricStore for TimeSeriesRepository {
    async fn find_dimension_names(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionNameRecord>> {
        let entries = self.discover(tenant, metric, None).await?;

        let mut candidates = Vec::new();
        for (metric, dimensions) in entries {
            for (name, _) in dimensions.iter() {
                candidates.push(DimensionNameRecord {
                    metric_name: metric.clone(),
                    dimension_name: name.clone(),
                });
            }
        }
        Ok(paging::paginate(candidates, page))
    }

    async fn find_dimension_values(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        dimension: &DimensionName,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionValueRecord>> {
        let entries = self.discover(tenant, metric, Some(dimension)).await?;

        let mut candidates = Vec::new();
        for (metric, dimensions) in entries {
            if let Some(value) = dimensions.get(dimension.as_str()) {
                candidates.push(DimensionValueRecord {
                    metric_name: metric,
                    dimension_name: dimension.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(paging::paginate(candidates, page))
    }

    async fn find_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> FacetResult<Page<MeasurementSeries>> {
        query.validate()?;
        let mode = query.mode();
        let cursor = query.cursor()?;

        let statement = builder::select_measurements(query);
        debug!(statement = %statement, "executing measurement read");

        let raw = self.api.query(&statement).await?;
        let raw_series = normalize::parse_document(&raw)?;

        // Definition identity is the series signature, so wildcard grouping
        // resolves locally through this side map instead of a follow-up query.
        let mut definitions: HashMap<String, DimensionSet> = HashMap::new();
        let mut rows: Vec<KeyedRow> = Vec::new();

        for one in &raw_series {
            let normalized = normalize::measurement_series(one)?;
            let group = match &mode {
                GroupingMode::SingleDefinition | GroupingMode::Merged => None,
                GroupingMode::ByDimensions(names) => {
                    Some(group_key_of(names, &normalized.dimensions))
                }
                GroupingMode::ByDefinition => {
                    definitions.insert(
                        normalized.definition.as_str().to_string(),
                        normalized.dimensions.clone(),
                    );
                    Some(normalized.definition.as_str().to_string())
                }
            };
            for row in normalized.rows {
                rows.push(KeyedRow::new(normalized.metric.clone(), group.clone(), row));
            }
        }

        if mode == GroupingMode::SingleDefinition {
            grouping::check_unambiguous(&rows)?;
        }

        paging::sort_rows(&mut rows);
        let rows = paging::filter_rows(rows, cursor.as_ref());
        let (rows, has_more) = paging::take_rows(rows, query.limit);

        let mut series = grouping::assemble_series(rows, &mode, query);
        if mode == GroupingMode::ByDefinition {
            for one in &mut series {
                if let Some(key) = &one.group_key {
                    one.dimensions = definitions.get(key).cloned();
                }
            }
        }

        Ok(Page::new(series, has_more))
    }
}
