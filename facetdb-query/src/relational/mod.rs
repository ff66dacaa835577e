//! Relational backend repository
//!
//! Implements the shared [`MetricStore`] contract over the columnar store.
//! The measurement statement pushes ordering, cursor filtering and the
//! limit+1 over-read into SQL, so only the truncation check runs in-process;
//! discovery reads the definitions side-table and paginates in-process like
//! the time-series path. Wildcard grouping costs one follow-up round trip
//! to resolve the observed definition identities.

pub mod builder;
pub mod executor;
pub mod normalize;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use facetdb_core::dimension::{is_reserved, DimensionName, DimensionSet};
use facetdb_core::error::{FacetError, FacetResult};
use facetdb_core::metric::MetricName;
use facetdb_core::page::{DimensionNameRecord, DimensionValueRecord, Page, PageRequest};
use facetdb_core::query::{GroupingMode, MeasurementQuery};
use facetdb_core::series::{DefinitionId, KeyedRow, MeasurementSeries};
use facetdb_core::store::MetricStore;
use facetdb_core::tenant::TenantId;

use crate::config::RelationalSettings;
use crate::grouping;
use crate::paging;
use executor::{PgExecutor, SqlExecutor, SqlValue};

/// Repository over the relational columnar store
pub struct RelationalRepository {
    executor: Arc<dyn SqlExecutor>,
    measurements_table: String,
    definitions_table: String,
}

impl RelationalRepository {
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        measurements_table: String,
        definitions_table: String,
    ) -> Self {
        Self {
            executor,
            measurements_table,
            definitions_table,
        }
    }

    /// Build the pool-backed repository from configuration
    pub async fn connect(settings: &RelationalSettings) -> FacetResult<Self> {
        let executor = PgExecutor::connect(&settings.url, settings.max_connections).await?;
        Ok(Self::new(
            Arc::new(executor),
            settings.measurements_table.clone(),
            settings.definitions_table.clone(),
        ))
    }

    /// One follow-up query resolving the full dimension set of every
    /// observed definition identity (wildcard-groupBy mode only)
    async fn resolve_definitions(
        &self,
        tenant: &TenantId,
        definitions: &[DefinitionId],
    ) -> FacetResult<HashMap<String, DimensionSet>> {
        if definitions.is_empty() {
            return Ok(HashMap::new());
        }
        let statement = builder::resolve_definitions(&self.definitions_table, tenant, definitions);
        debug!(count = definitions.len(), "resolving definition dimensions");

        let mut resolved: HashMap<String, DimensionSet> = HashMap::new();
        for row in self.executor.fetch(&statement).await? {
            let (id, name, value) = match (
                row.get("definition_id"),
                row.get("dimension_name"),
                row.get("dimension_value"),
            ) {
                (
                    Some(SqlValue::Text(id)),
                    Some(SqlValue::Text(name)),
                    Some(SqlValue::Text(value)),
                ) => (id.clone(), name.clone(), value.clone()),
                _ => {
                    return Err(FacetError::malformed(
                        "definition row is missing id, name or value",
                    ))
                }
            };
            if is_reserved(&name) {
                continue;
            }
            let name = DimensionName::new(&name).map_err(|_| {
                FacetError::malformed(format!("invalid dimension name '{}' in definitions", name))
            })?;
            resolved.entry(id).or_default().insert(name, value);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl MetricStore for RelationalRepository {
    async fn find_dimension_names(
        &self,
        tenant: &TenantId,
        metric: Option<&MetricName>,
        page: &PageRequest,
    ) -> FacetResult<Page<DimensionNameRecord>> {
        let statement = builder::dimension_names(&self.definitions_table, tenant, metric);
        let rows = self.executor.fetch(&statement).await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let (metric, name) = match (row.get("metric_name"), row.get("dimension_name")) {
                (Some(SqlValue::Text(metric)), Some(SqlValue::Text(name))) => {
                    (metric.clone(), name.clone())
                }
                _ => return Err(FacetError::malformed("discovery row is missing a column")),
            };
            if is_reserved(&name) {
                continue;
            }
            candidates.push(DimensionNameRecord {
                metric_name: MetricName::from(metric.as_str()),
                dimension_name: DimensionName::new(&name).map_err(|_| {
                    FacetError::malformed(format!("invalid dimension name '{}' in store", name))
                })?,
            });
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
        let statement =
            builder::dimension_values(&self.definitions_table, tenant, metric, dimension);
        let rows = self.executor.fetch(&statement).await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let (metric, value) = match (row.get("metric_name"), row.get("dimension_value")) {
                (Some(SqlValue::Text(metric)), Some(SqlValue::Text(value))) => {
                    (metric.clone(), value.clone())
                }
                _ => return Err(FacetError::malformed("discovery row is missing a column")),
            };
            candidates.push(DimensionValueRecord {
                metric_name: MetricName::from(metric.as_str()),
                dimension_name: dimension.clone(),
                value,
            });
        }
        Ok(paging::paginate(candidates, page))
    }

    async fn find_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> FacetResult<Page<MeasurementSeries>> {
        query.validate()?;
        let mode = query.mode();

        let statement = builder::measurements(&self.measurements_table, query)?;
        debug!(statement = %statement.text, "executing measurement read");

        let mut rows: Vec<KeyedRow> = Vec::new();
        for raw in self.executor.fetch(&statement).await? {
            rows.push(normalize::canonical_row(&raw)?);
        }

        // The statement already ordered, cursor-filtered and over-read by
        // one; the full delivered set still feeds the ambiguity check so the
        // extra row can reveal a second definition.
        if mode == GroupingMode::SingleDefinition {
            grouping::check_unambiguous(&rows)?;
        }
        let (rows, has_more) = paging::take_rows(rows, query.limit);

        let mut series = grouping::assemble_series(rows, &mode, query);
        if mode == GroupingMode::ByDefinition {
            let observed: Vec<DefinitionId> = series
                .iter()
                .filter_map(|s| s.id.clone())
                .collect();
            let resolved = self.resolve_definitions(&query.tenant, &observed).await?;
            for one in &mut series {
                if let Some(id) = &one.id {
                    one.dimensions = resolved.get(id.as_str()).cloned();
                }
            }
        }

        Ok(Page::new(series, has_more))
    }
}
