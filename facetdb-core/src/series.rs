//! Canonical measurement rows and assembled series

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dimension::DimensionSet;
use crate::metric::MetricName;
use crate::time::Timestamp;

/// Backend-assigned identity of one specific dimension-set instance of a
/// metric. Opaque to this layer; the relational store uses surrogate ids,
/// the time-series store uses the series' dimension signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(String);

impl DefinitionId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DefinitionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DefinitionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One measurement in canonical form, backend differences erased
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<DefinitionId>,
    pub timestamp: Timestamp,
    pub value: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_metadata: BTreeMap<String, String>,
}

impl CanonicalRow {
    pub fn new(definition_id: Option<DefinitionId>, timestamp: Timestamp, value: f64) -> Self {
        Self {
            definition_id,
            timestamp,
            value,
            value_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.value_metadata = metadata;
        self
    }
}

/// A canonical row tagged with the grouping key the active mode assigned it.
/// The key is `None` when the query does not group.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRow {
    pub metric: MetricName,
    pub group: Option<String>,
    pub row: CanonicalRow,
}

impl KeyedRow {
    pub fn new(metric: MetricName, group: Option<String>, row: CanonicalRow) -> Self {
        Self { metric, group, row }
    }

    /// Grouping key for ordering; ungrouped rows compare as the empty key
    pub fn group_str(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }
}

/// Full dimension set of a definition, resolved from the definitions
/// side-table (relational) or the series signature (time-series)
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefinition {
    pub metric: MetricName,
    pub dimensions: DimensionSet,
}

/// An ordered run of measurements reported under one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DefinitionId>,
    pub metric_name: MetricName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<DimensionSet>,
    /// Group identity used for final ordering and cursor derivation;
    /// not part of the serialized shape.
    #[serde(skip)]
    pub group_key: Option<String>,
    pub measurements: Vec<CanonicalRow>,
}

impl MeasurementSeries {
    pub fn new(metric_name: MetricName) -> Self {
        Self {
            id: None,
            metric_name,
            dimensions: None,
            group_key: None,
            measurements: Vec::new(),
        }
    }

    pub fn push(&mut self, row: CanonicalRow) {
        self.measurements.push(row);
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Timestamp of the last measurement, if any
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.measurements.last().map(|row| row.timestamp)
    }

    /// Check the ordering invariant: timestamps never decrease
    pub fn is_time_ordered(&self) -> bool {
        self.measurements
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}
