//! Measurement query specification and grouping modes

use crate::cursor::Cursor;
use crate::dimension::{DimensionName, DimensionSet};
use crate::error::{FacetError, FacetResult};
use crate::metric::MetricName;
use crate::tenant::TenantId;
use crate::time::QueryWindow;

/// Token in a groupBy list requesting grouping by full definition identity
pub const GROUP_BY_WILDCARD: &str = "*";

/// Joins dimension values into one grouping key. The relational builder
/// renders the same separator into its `concat_ws` expression, so the key a
/// row carries and the key SQL ordered by are byte-identical.
pub const GROUP_KEY_SEPARATOR: char = '|';

/// Requested grouping, parsed from the caller's groupBy list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupBy {
    /// No grouping requested
    None,
    /// Group by the named dimensions, in the order given
    Dimensions(Vec<DimensionName>),
    /// The wildcard token: group by full definition identity
    Definition,
}

impl GroupBy {
    /// Parse a caller-supplied list of groupBy entries. A list containing
    /// the wildcard token anywhere selects definition grouping.
    pub fn from_names<I, S>(names: I) -> FacetResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();

        if names.is_empty() {
            return Ok(GroupBy::None);
        }
        if names.iter().any(|n| n == GROUP_BY_WILDCARD) {
            return Ok(GroupBy::Definition);
        }

        let mut dimensions = Vec::with_capacity(names.len());
        for name in names {
            let name = DimensionName::new_exposed(name)?;
            if dimensions.contains(&name) {
                return Err(FacetError::validation(format!(
                    "Duplicate groupBy dimension '{}'",
                    name
                )));
            }
            dimensions.push(name);
        }
        Ok(GroupBy::Dimensions(dimensions))
    }

    pub fn is_grouped(&self) -> bool {
        !matches!(self, GroupBy::None)
    }
}

/// The mutually exclusive execution modes of the grouping engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupingMode {
    /// No grouping, no merge: all rows must share one definition
    SingleDefinition,
    /// Merge requested: all rows collapse into one series
    Merged,
    /// Bucket rows by the concatenated values of the named dimensions
    ByDimensions(Vec<DimensionName>),
    /// Bucket rows by definition identity
    ByDefinition,
}

impl GroupingMode {
    /// Grouped modes paginate with composite cursors
    pub fn is_grouped(&self) -> bool {
        matches!(
            self,
            GroupingMode::ByDimensions(_) | GroupingMode::ByDefinition
        )
    }
}

/// Normalized measurement query, validated at the resource boundary
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementQuery {
    pub tenant: TenantId,
    pub metric: Option<MetricName>,
    pub filters: DimensionSet,
    pub window: QueryWindow,
    /// Opaque continuation cursor as received from the caller
    pub offset: Option<String>,
    pub limit: usize,
    pub group_by: GroupBy,
    pub merge_metrics: bool,
}

impl MeasurementQuery {
    pub fn validate(&self) -> FacetResult<()> {
        if self.limit == 0 {
            return Err(FacetError::validation("Limit must be positive"));
        }
        Ok(())
    }

    /// Select the grouping mode. Merge takes precedence: a merged query
    /// ignores its groupBy, matching the ordering rule that only sorts by
    /// group when metrics are not being merged.
    pub fn mode(&self) -> GroupingMode {
        if self.merge_metrics {
            return GroupingMode::Merged;
        }
        match &self.group_by {
            GroupBy::None => GroupingMode::SingleDefinition,
            GroupBy::Dimensions(names) => GroupingMode::ByDimensions(names.clone()),
            GroupBy::Definition => GroupingMode::ByDefinition,
        }
    }

    /// Whether results are grouped, i.e. whether cursors are composite
    pub fn is_grouped(&self) -> bool {
        !self.merge_metrics && self.group_by.is_grouped()
    }

    /// Parse the caller's offset into a cursor of the form the current
    /// grouping mode requires
    pub fn cursor(&self) -> FacetResult<Option<Cursor>> {
        self.offset
            .as_deref()
            .map(|s| Cursor::parse(s, self.is_grouped()))
            .transpose()
    }
}

/// Join the values of the named dimensions into a grouping key. A missing
/// dimension contributes an empty segment.
pub fn group_key_of(names: &[DimensionName], dimensions: &DimensionSet) -> String {
    names
        .iter()
        .map(|name| dimensions.get(name.as_str()).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(&GROUP_KEY_SEPARATOR.to_string())
}

/// Reconstruct dimensions from a grouping key by pairwise splitting. The
/// split is capped at the name count, so the final value keeps any embedded
/// separator.
pub fn split_group_key(names: &[DimensionName], key: &str) -> DimensionSet {
    let mut dimensions = DimensionSet::new();
    let values = key.splitn(names.len(), GROUP_KEY_SEPARATOR);
    for (name, value) in names.iter().zip(values) {
        dimensions.insert(name.clone(), value);
    }
    dimensions
}
