//! Grouping & merge engine
//!
//! Turns a cursor-ordered run of canonical rows into zero or more series
//! according to the query's grouping mode. Bucketing is a single ordered
//! pass: a new series opens whenever the group key changes relative to the
//! previous row, which is correct because the rows arrive pre-sorted by
//! (group, timestamp), either by the relational ORDER BY or by the
//! in-process sort in [`crate::paging`].

use std::collections::HashSet;

use facetdb_core::error::{FacetError, FacetResult};
use facetdb_core::query::{split_group_key, GroupingMode, MeasurementQuery};
use facetdb_core::series::{DefinitionId, KeyedRow, MeasurementSeries};

/// Reject a row set spanning more than one metric definition.
///
/// Only called for the no-grouping, no-merge mode: once groupBy is non-empty
/// ambiguity is a grouping concern, and a merged query discards definition
/// identity on purpose. Runs over the full delivered row set, before the
/// over-read trim, so the extra row can still reveal a second definition.
pub fn check_unambiguous(rows: &[KeyedRow]) -> FacetResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for keyed in rows {
        if let Some(id) = &keyed.row.definition_id {
            seen.insert(id.as_str());
            if seen.len() > 1 {
                return Err(FacetError::ambiguous_metric(
                    "query matches multiple metric definitions; \
                     group or merge to disambiguate",
                ));
            }
        }
    }
    Ok(())
}

/// Assemble the final page of rows into ordered series.
///
/// Rows must already be sorted, cursor-filtered and trimmed to the page;
/// this step only shapes them. The closing sort by group identity keeps the
/// ordering guarantee independent of how the buckets were assembled.
pub fn assemble_series(
    rows: Vec<KeyedRow>,
    mode: &GroupingMode,
    query: &MeasurementQuery,
) -> Vec<MeasurementSeries> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut series = match mode {
        GroupingMode::SingleDefinition => {
            let mut single = MeasurementSeries::new(rows[0].metric.clone());
            single.id = rows[0].row.definition_id.clone();
            single.dimensions = Some(query.filters.clone());
            for keyed in rows {
                single.push(keyed.row);
            }
            vec![single]
        }

        GroupingMode::Merged => {
            // Definition identity is intentionally discarded; the series
            // reports the caller's filter verbatim.
            let mut merged = MeasurementSeries::new(rows[0].metric.clone());
            merged.dimensions = Some(query.filters.clone());
            for keyed in rows {
                merged.push(keyed.row);
            }
            vec![merged]
        }

        GroupingMode::ByDimensions(names) => {
            let mut out: Vec<MeasurementSeries> = Vec::new();
            for keyed in rows {
                let key = keyed.group_str();
                match out.last_mut() {
                    Some(open) if open.group_key.as_deref() == Some(key) => {
                        open.push(keyed.row);
                    }
                    _ => {
                        let mut opened = MeasurementSeries::new(keyed.metric.clone());
                        opened.dimensions = Some(split_group_key(names, key));
                        opened.group_key = Some(key.to_string());
                        opened.push(keyed.row);
                        out.push(opened);
                    }
                }
            }
            out
        }

        GroupingMode::ByDefinition => {
            let mut out: Vec<MeasurementSeries> = Vec::new();
            for keyed in rows {
                let key = keyed.group_str();
                match out.last_mut() {
                    Some(open) if open.group_key.as_deref() == Some(key) => {
                        open.push(keyed.row);
                    }
                    _ => {
                        let mut opened = MeasurementSeries::new(keyed.metric.clone());
                        opened.id = Some(DefinitionId::new(key));
                        opened.group_key = Some(key.to_string());
                        opened.push(keyed.row);
                        out.push(opened);
                    }
                }
            }
            out
        }
    };

    series.sort_by(|a, b| a.group_key.cmp(&b.group_key));
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetdb_core::dimension::{DimensionName, DimensionSet};
    use facetdb_core::metric::MetricName;
    use facetdb_core::query::{group_key_of, GroupBy};
    use facetdb_core::series::CanonicalRow;
    use facetdb_core::tenant::TenantId;
    use facetdb_core::time::{QueryWindow, Timestamp};
    use std::collections::HashMap;

    fn query(group_by: GroupBy, merge: bool) -> MeasurementQuery {
        let mut filters = HashMap::new();
        filters.insert("env".to_string(), "prod".to_string());
        MeasurementQuery {
            tenant: TenantId::new("acme").unwrap(),
            metric: Some(MetricName::new("cpu.idle").unwrap()),
            filters: DimensionSet::from_map(filters).unwrap(),
            window: QueryWindow::since(Timestamp::from_millis(0).unwrap()),
            offset: None,
            limit: 100,
            group_by,
            merge_metrics: merge,
        }
    }

    fn keyed(definition: Option<&str>, group: Option<&str>, millis: i64) -> KeyedRow {
        KeyedRow::new(
            MetricName::new("cpu.idle").unwrap(),
            group.map(str::to_string),
            CanonicalRow::new(
                definition.map(DefinitionId::new),
                Timestamp::from_millis(millis).unwrap(),
                1.0,
            ),
        )
    }

    #[test]
    fn test_ambiguity_check() {
        let one = vec![keyed(Some("d1"), None, 0), keyed(Some("d1"), None, 1000)];
        assert!(check_unambiguous(&one).is_ok());

        let two = vec![keyed(Some("d1"), None, 0), keyed(Some("d2"), None, 1000)];
        let err = check_unambiguous(&two).unwrap_err();
        assert_eq!(err.category(), "ambiguous_metric");

        assert!(check_unambiguous(&[]).is_ok());
    }

    #[test]
    fn test_single_definition_series_shape() {
        let q = query(GroupBy::None, false);
        let rows = vec![keyed(Some("d1"), None, 0), keyed(Some("d1"), None, 1000)];
        let series = assemble_series(rows, &q.mode(), &q);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].id.as_ref().unwrap().as_str(), "d1");
        assert_eq!(series[0].dimensions.as_ref().unwrap().get("env"), Some("prod"));
        assert_eq!(series[0].len(), 2);
        assert!(series[0].is_time_ordered());
    }

    #[test]
    fn test_merge_collapses_definitions() {
        let q = query(GroupBy::None, true);
        let rows = vec![
            keyed(Some("d1"), None, 0),
            keyed(Some("d2"), None, 500),
            keyed(Some("d1"), None, 1000),
        ];
        let series = assemble_series(rows, &q.mode(), &q);

        assert_eq!(series.len(), 1);
        assert!(series[0].id.is_none());
        assert_eq!(series[0].dimensions.as_ref().unwrap().get("env"), Some("prod"));
        assert_eq!(series[0].len(), 3);
    }

    #[test]
    fn test_group_by_dimensions_reconstructs_dimensions() {
        let names = vec![
            DimensionName::new("host").unwrap(),
            DimensionName::new("region").unwrap(),
        ];
        let q = query(GroupBy::Dimensions(names.clone()), false);

        let mut dims_a = DimensionSet::new();
        dims_a.insert(DimensionName::new("host").unwrap(), "a");
        dims_a.insert(DimensionName::new("region").unwrap(), "us");
        let key_a = group_key_of(&names, &dims_a);

        let rows = vec![
            keyed(Some("d1"), Some(&key_a), 0),
            keyed(Some("d1"), Some(&key_a), 1000),
            keyed(Some("d2"), Some("b|eu"), 500),
        ];
        let series = assemble_series(rows, &q.mode(), &q);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].dimensions.as_ref().unwrap().get("host"), Some("a"));
        assert_eq!(series[0].dimensions.as_ref().unwrap().get("region"), Some("us"));
        assert_eq!(series[0].len(), 2);
        assert_eq!(series[1].dimensions.as_ref().unwrap().get("host"), Some("b"));
        assert_eq!(series[1].len(), 1);
    }

    #[test]
    fn test_grouping_partitions_rows() {
        let q = query(GroupBy::Definition, false);
        let rows = vec![
            keyed(Some("d1"), Some("d1"), 0),
            keyed(Some("d1"), Some("d1"), 1000),
            keyed(Some("d2"), Some("d2"), 500),
            keyed(Some("d2"), Some("d2"), 1500),
        ];
        let total = rows.len();
        let series = assemble_series(rows, &q.mode(), &q);

        assert_eq!(series.len(), 2);
        let reassembled: usize = series.iter().map(MeasurementSeries::len).sum();
        assert_eq!(reassembled, total);
        for s in &series {
            assert_eq!(s.id.as_ref().map(|id| id.as_str()), s.group_key.as_deref());
            assert!(s
                .measurements
                .iter()
                .all(|row| row.definition_id.as_ref().map(|d| d.as_str()) == s.group_key.as_deref()));
        }
    }

    #[test]
    fn test_final_sort_by_group_identity() {
        let q = query(GroupBy::Definition, false);
        // Buckets arriving out of identity order still come back sorted
        let rows = vec![
            keyed(Some("d2"), Some("d2"), 0),
            keyed(Some("d1"), Some("d1"), 0),
        ];
        let series = assemble_series(rows, &q.mode(), &q);

        let keys: Vec<&str> = series.iter().filter_map(|s| s.group_key.as_deref()).collect();
        assert_eq!(keys, vec!["d1", "d2"]);
    }

    #[test]
    fn test_empty_rows_make_no_series() {
        let q = query(GroupBy::None, false);
        assert!(assemble_series(Vec::new(), &q.mode(), &q).is_empty());
    }
}
