//! Normalizer for the time-series backend's response documents
//!
//! The backend answers with a JSON document of named series, each carrying a
//! shared column list and positional value rows. An absent series collection
//! is an empty result; a truncated or shapeless document fails the whole
//! request, because nothing downstream can be trusted without the column
//! layout.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use facetdb_core::dimension::{is_reserved, DimensionName, DimensionSet};
use facetdb_core::error::{FacetError, FacetResult};
use facetdb_core::metric::MetricName;
use facetdb_core::series::{CanonicalRow, DefinitionId};
use facetdb_core::time::Timestamp;

#[derive(Debug, Deserialize)]
struct QueryDocument {
    #[serde(default)]
    results: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Option<Vec<RawSeries>>,
    #[serde(default)]
    error: Option<String>,
}

/// One named series as the backend reports it
#[derive(Debug, Deserialize)]
pub struct RawSeries {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub values: Vec<Vec<JsonValue>>,
}

/// Decode a raw response document into its series list. A populated error
/// member is a backend failure; an absent series collection is simply empty.
pub fn parse_document(raw: &str) -> FacetResult<Vec<RawSeries>> {
    let document: QueryDocument = serde_json::from_str(raw)?;

    let mut series = Vec::new();
    for result in document.results {
        if let Some(error) = result.error.filter(|e| !e.is_empty()) {
            return Err(FacetError::backend(format!(
                "Time-series backend reported: {}",
                error
            )));
        }
        if let Some(found) = result.series {
            series.extend(found);
        }
    }
    Ok(series)
}

/// Extract one dimension set per value row of a discovery series, pairing
/// column names positionally with cell values. The internal tenant
/// dimension and other reserved identifiers never reach the caller.
pub fn discovery_entries(series: &RawSeries) -> FacetResult<Vec<(MetricName, DimensionSet)>> {
    let columns = series.columns.as_ref().ok_or_else(|| {
        FacetError::malformed(format!("series '{}' is missing its column list", series.name))
    })?;

    let metric = MetricName::from(series.name.as_str());
    let mut entries = Vec::with_capacity(series.values.len());

    for row in &series.values {
        if row.len() != columns.len() {
            return Err(FacetError::malformed(format!(
                "series '{}' row has {} cells for {} columns",
                series.name,
                row.len(),
                columns.len()
            )));
        }

        let mut dimensions = DimensionSet::new();
        for (column, cell) in columns.iter().zip(row) {
            if is_reserved(column) || cell.is_null() {
                continue;
            }
            let value = stringify(cell);
            if value.is_empty() {
                continue;
            }
            let name = DimensionName::new(column).map_err(|_| {
                FacetError::malformed(format!("invalid dimension name '{}' in series", column))
            })?;
            dimensions.insert(name, value);
        }
        entries.push((metric.clone(), dimensions));
    }
    Ok(entries)
}

/// One measurement series in canonical form
#[derive(Debug)]
pub struct NormalizedSeries {
    pub metric: MetricName,
    pub dimensions: DimensionSet,
    pub definition: DefinitionId,
    pub rows: Vec<CanonicalRow>,
}

/// Normalize one measurement series. The series' canonical dimension
/// signature (prefixed with the metric so wildcard scans stay unique)
/// doubles as its definition identity, making ambiguity checks and wildcard
/// grouping work without any follow-up lookup.
pub fn measurement_series(series: &RawSeries) -> FacetResult<NormalizedSeries> {
    let columns = series.columns.as_ref().ok_or_else(|| {
        FacetError::malformed(format!("series '{}' is missing its column list", series.name))
    })?;
    let time_index = columns.iter().position(|c| c == "time").ok_or_else(|| {
        FacetError::malformed(format!("series '{}' has no time column", series.name))
    })?;
    let value_index = columns.iter().position(|c| c == "value").ok_or_else(|| {
        FacetError::malformed(format!("series '{}' has no value column", series.name))
    })?;

    let metric = MetricName::from(series.name.as_str());
    let mut dimensions = DimensionSet::new();
    for (key, value) in &series.tags {
        if is_reserved(key) {
            continue;
        }
        let name = DimensionName::new(key).map_err(|_| {
            FacetError::malformed(format!("invalid dimension name '{}' in series tags", key))
        })?;
        dimensions.insert(name, value.clone());
    }
    let definition = DefinitionId::new(format!("{}:{}", metric, dimensions.signature()));

    let mut rows = Vec::with_capacity(series.values.len());
    for raw_row in &series.values {
        if raw_row.len() != columns.len() {
            return Err(FacetError::malformed(format!(
                "series '{}' row has {} cells for {} columns",
                series.name,
                raw_row.len(),
                columns.len()
            )));
        }

        // A null value cell is a gap, not an error
        let value_cell = &raw_row[value_index];
        if value_cell.is_null() {
            continue;
        }
        let value = value_cell.as_f64().ok_or_else(|| {
            FacetError::malformed(format!(
                "series '{}' has a non-numeric value cell: {}",
                series.name, value_cell
            ))
        })?;

        let timestamp = parse_time(&raw_row[time_index])?;

        let mut metadata = BTreeMap::new();
        for (index, cell) in raw_row.iter().enumerate() {
            if index == time_index || index == value_index || cell.is_null() {
                continue;
            }
            metadata.insert(columns[index].clone(), stringify(cell));
        }

        rows.push(
            CanonicalRow::new(Some(definition.clone()), timestamp, value).with_metadata(metadata),
        );
    }

    Ok(NormalizedSeries {
        metric,
        dimensions,
        definition,
        rows,
    })
}

/// Time cells arrive as RFC3339 text or an epoch-milliseconds number
fn parse_time(cell: &JsonValue) -> FacetResult<Timestamp> {
    match cell {
        JsonValue::String(text) => Timestamp::from_rfc3339(text)
            .map_err(|_| FacetError::malformed(format!("unparseable time cell: '{}'", text))),
        JsonValue::Number(number) => {
            let millis = number
                .as_i64()
                .ok_or_else(|| FacetError::malformed(format!("unparseable time cell: {}", number)))?;
            Timestamp::from_millis(millis)
                .map_err(|_| FacetError::malformed(format!("time cell out of range: {}", millis)))
        }
        other => Err(FacetError::malformed(format!(
            "time cell is neither text nor number: {}",
            other
        ))),
    }
}

fn stringify(cell: &JsonValue) -> String {
    match cell {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
