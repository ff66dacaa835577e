//! Dimension names, values and sets
//!
//! A dimension is a named facet attached to a series ("host", "region").
//! Dimension names double as relational column identifiers, so their charset
//! is stricter than metric names and a reserved list keeps them from
//! colliding with fixed schema columns or the internal tenant dimension.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{FacetError, FacetResult};

/// Internal dimension carrying the tenant id on the time-series backend.
/// Never reported to callers and never accepted from them.
pub const TENANT_DIMENSION: &str = "_tenant";

/// Identifiers dimension names may not collide with: the internal tenant
/// dimension plus the fixed relational schema columns.
pub const RESERVED_DIMENSIONS: &[&str] = &[
    TENANT_DIMENSION,
    "tenant_id",
    "metric_name",
    "definition_id",
    "time_stamp",
    "value",
    "value_meta",
];

/// Check whether a dimension name collides with a reserved identifier
pub fn is_reserved(name: &str) -> bool {
    RESERVED_DIMENSIONS.contains(&name)
}

/// Dimension name - identifies one facet of a series
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionName(String);

impl DimensionName {
    /// Create a new dimension name
    pub fn new<S: Into<String>>(name: S) -> FacetResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(FacetError::validation("Dimension name cannot be empty"));
        }

        if name.len() > crate::MAX_DIMENSION_LENGTH {
            return Err(FacetError::validation(format!(
                "Dimension name too long: {} > {}",
                name.len(),
                crate::MAX_DIMENSION_LENGTH
            )));
        }

        // Stricter than metric names: these become column identifiers
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(FacetError::validation(
                "Dimension name contains invalid characters",
            ));
        }

        Ok(Self(name))
    }

    /// Create a name, additionally rejecting reserved identifiers.
    /// Use for caller-supplied names (filters, groupBy, discovery targets).
    pub fn new_exposed<S: Into<String>>(name: S) -> FacetResult<Self> {
        let name = Self::new(name)?;
        if is_reserved(name.as_str()) {
            return Err(FacetError::validation(format!(
                "Dimension name '{}' is reserved",
                name
            )));
        }
        Ok(name)
    }

    /// Create without validation (for internal use)
    pub(crate) fn new_unchecked<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DimensionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for DimensionName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DimensionName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One name/value pair extracted from a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub name: DimensionName,
    pub value: String,
}

impl DimensionEntry {
    pub fn new(name: DimensionName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// An ordered set of dimension name/value pairs.
///
/// Used both for caller-supplied equality filters and for the dimensions
/// reported on a series. BTreeMap keeps iteration order deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSet {
    dimensions: BTreeMap<DimensionName, String>,
}

impl DimensionSet {
    /// Create a new empty dimension set
    pub fn new() -> Self {
        Self {
            dimensions: BTreeMap::new(),
        }
    }

    /// Build from caller-supplied pairs, validating names and rejecting
    /// reserved identifiers
    pub fn from_map(map: HashMap<String, String>) -> FacetResult<Self> {
        let mut dimensions = BTreeMap::new();

        for (name, value) in map {
            let name = DimensionName::new_exposed(name)?;
            if value.is_empty() {
                return Err(FacetError::validation(format!(
                    "Dimension '{}' has an empty value",
                    name
                )));
            }
            if value.len() > crate::MAX_DIMENSION_LENGTH {
                return Err(FacetError::validation(format!(
                    "Dimension '{}' value too long: {} > {}",
                    name,
                    value.len(),
                    crate::MAX_DIMENSION_LENGTH
                )));
            }
            dimensions.insert(name, value);
        }

        if dimensions.len() > crate::MAX_DIMENSIONS_PER_QUERY {
            return Err(FacetError::validation(format!(
                "Too many dimensions: {} > {}",
                dimensions.len(),
                crate::MAX_DIMENSIONS_PER_QUERY
            )));
        }

        Ok(Self { dimensions })
    }

    /// Insert a pair without caller-facing validation (for internal use)
    pub fn insert(&mut self, name: DimensionName, value: impl Into<String>) {
        self.dimensions.insert(name, value.into());
    }

    /// Get a value by dimension name
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = DimensionName::new_unchecked(name);
        self.dimensions.get(&key).map(String::as_str)
    }

    /// Get the number of dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&DimensionName, &str)> {
        self.dimensions.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Canonical signature of this set: `name=value` pairs in name order,
    /// joined with commas. Stable across calls, usable as an identity.
    pub fn signature(&self) -> String {
        self.dimensions
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse a signature produced by [`DimensionSet::signature`]
    pub fn parse_signature(s: &str) -> FacetResult<Self> {
        if s.is_empty() {
            return Ok(Self::new());
        }

        let mut dimensions = BTreeMap::new();
        for pair in s.split(',') {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| FacetError::malformed(format!("Invalid dimension pair: {}", pair)))?;
            dimensions.insert(DimensionName::new(name)?, value.to_string());
        }

        Ok(Self { dimensions })
    }

    /// Convert to a plain map for serialization boundaries
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.dimensions
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect()
    }
}

impl FromIterator<(DimensionName, String)> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = (DimensionName, String)>>(iter: I) -> Self {
        Self {
            dimensions: iter.into_iter().collect(),
        }
    }
}
