//! Pagination & cursor engine
//!
//! One algorithm serves the discovery operations and the measurement path:
//! dedup, an explicit sort, a strict-greater cursor filter, then accumulate
//! until `limit` items are taken or the limit+1 over-read slot is consumed.
//! The sort is a separate step from the filter so the ordering guarantee can
//! be tested on its own; backend output order is never trusted for the
//! in-process paths.

use std::collections::HashSet;

use facetdb_core::cursor::Cursor;
use facetdb_core::page::{Page, PageItem, PageRequest};
use facetdb_core::series::KeyedRow;

/// Paginate an unordered candidate collection by its cursor key.
///
/// Candidates are put into cursor-key order before duplicates collapse, with
/// the item's tie-break deciding among key-sharers, so a wildcard catalog
/// scan reports each name/value once with the smallest contributing metric
/// regardless of backend delivery order. Items lexicographically at or
/// before the offset are skipped.
pub fn paginate<T: PageItem>(mut candidates: Vec<T>, page: &PageRequest) -> Page<T> {
    // Explicit total order, independent of backend output order; the sort
    // runs before dedup so the surviving duplicate is deterministic too
    candidates.sort_by(|a, b| {
        a.cursor_key()
            .cmp(&b.cursor_key())
            .then_with(|| a.tie_break().cmp(b.tie_break()))
    });

    let mut seen = HashSet::new();
    let unique: Vec<T> = candidates
        .into_iter()
        .filter(|item| seen.insert(item.cursor_key()))
        .collect();

    let admitted = unique.into_iter().filter(|item| match page.offset_str() {
        Some(offset) => item.cursor_key().as_str() > offset,
        None => true,
    });
    take_page(admitted, page.limit)
}

/// Sort measurement rows into the cursor's total order: group identity
/// first, timestamp within a group. Ungrouped rows all share the empty
/// group, so this degrades to a plain time sort.
pub fn sort_rows(rows: &mut [KeyedRow]) {
    rows.sort_by(|a, b| {
        a.group_str()
            .cmp(b.group_str())
            .then(a.row.timestamp.cmp(&b.row.timestamp))
    });
}

/// Drop rows at or before the cursor. Rows must already be in cursor order.
pub fn filter_rows(rows: Vec<KeyedRow>, cursor: Option<&Cursor>) -> Vec<KeyedRow> {
    match cursor {
        Some(cursor) => rows
            .into_iter()
            .filter(|keyed| cursor.admits(keyed.group_str(), keyed.row.timestamp))
            .collect(),
        None => rows,
    }
}

/// Take a page of rows with the over-read rule: `limit` rows come back, and
/// one extra surviving row flips the truncation signal.
pub fn take_rows(rows: Vec<KeyedRow>, limit: usize) -> (Vec<KeyedRow>, bool) {
    let has_more = rows.len() > limit;
    let mut rows = rows;
    rows.truncate(limit);
    (rows, has_more)
}

fn take_page<T>(candidates: impl Iterator<Item = T>, limit: usize) -> Page<T> {
    let mut items = Vec::with_capacity(limit);
    let mut has_more = false;
    for item in candidates {
        if items.len() == limit {
            has_more = true;
            break;
        }
        items.push(item);
    }
    Page::new(items, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetdb_core::metric::MetricName;
    use facetdb_core::page::DimensionValueRecord;
    use facetdb_core::series::CanonicalRow;
    use facetdb_core::time::Timestamp;
    use facetdb_core::DimensionName;

    fn value_record(metric: &str, value: &str) -> DimensionValueRecord {
        DimensionValueRecord {
            metric_name: MetricName::new(metric).unwrap(),
            dimension_name: DimensionName::new("host").unwrap(),
            value: value.to_string(),
        }
    }

    fn keyed(group: Option<&str>, millis: i64) -> KeyedRow {
        KeyedRow::new(
            MetricName::new("cpu.idle").unwrap(),
            group.map(str::to_string),
            CanonicalRow::new(None, Timestamp::from_millis(millis).unwrap(), 1.0),
        )
    }

    #[test]
    fn test_paginate_sorts_and_dedups() {
        let candidates = vec![
            value_record("cpu.idle", "c"),
            value_record("cpu.idle", "a"),
            value_record("mem.used", "a"),
            value_record("cpu.idle", "b"),
        ];
        let page = paginate(candidates, &PageRequest::first(10).unwrap());

        let values: Vec<&str> = page.items.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        // Smallest metric wins on the duplicate value
        assert_eq!(page.items[0].metric_name, "cpu.idle");
        assert!(!page.has_more);
    }

    #[test]
    fn test_paginate_dedup_survivor_ignores_delivery_order() {
        // SELECT DISTINCT carries no ORDER BY, so the same catalog can come
        // back in any row order; the metric attributed to a shared value
        // must not change with it.
        let forward = vec![value_record("cpu.idle", "a"), value_record("mem.used", "a")];
        let backward = vec![value_record("mem.used", "a"), value_record("cpu.idle", "a")];

        let page_one = paginate(forward, &PageRequest::first(10).unwrap());
        let page_two = paginate(backward, &PageRequest::first(10).unwrap());

        assert_eq!(page_one.items, page_two.items);
        assert_eq!(page_one.items[0].metric_name, "cpu.idle");
    }

    #[test]
    fn test_paginate_offset_is_strictly_exclusive() {
        let candidates = vec![
            value_record("m", "a"),
            value_record("m", "b"),
            value_record("m", "c"),
        ];
        let page = paginate(
            candidates,
            &PageRequest::new(Some("b".to_string()), 10).unwrap(),
        );

        let values: Vec<&str> = page.items.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["c"]);
    }

    #[test]
    fn test_paginate_over_read_signal() {
        let candidates: Vec<_> = (0..3).map(|i| value_record("m", &format!("v{}", i))).collect();

        let truncated = paginate(candidates.clone(), &PageRequest::first(2).unwrap());
        assert_eq!(truncated.len(), 2);
        assert!(truncated.has_more);

        let exact = paginate(candidates, &PageRequest::first(3).unwrap());
        assert_eq!(exact.len(), 3);
        assert!(!exact.has_more);
    }

    #[test]
    fn test_paginate_chained_pages_cover_everything() {
        let candidates: Vec<_> = ["e", "b", "a", "d", "c"]
            .iter()
            .map(|v| value_record("m", v))
            .collect();

        let mut collected = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let page = paginate(
                candidates.clone(),
                &PageRequest::new(offset.clone(), 2).unwrap(),
            );
            collected.extend(page.items.iter().map(|r| r.value.clone()));
            match page.next_offset() {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        assert_eq!(collected, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_sort_rows_orders_group_then_time() {
        let mut rows = vec![
            keyed(Some("b"), 1000),
            keyed(Some("a"), 2000),
            keyed(Some("a"), 1000),
            keyed(None, 500),
        ];
        sort_rows(&mut rows);

        let order: Vec<(String, i64)> = rows
            .iter()
            .map(|r| (r.group_str().to_string(), r.row.timestamp.timestamp_millis()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("".to_string(), 500),
                ("a".to_string(), 1000),
                ("a".to_string(), 2000),
                ("b".to_string(), 1000),
            ]
        );
    }

    #[test]
    fn test_filter_rows_composite_cursor() {
        let rows = vec![
            keyed(Some("a"), 1000),
            keyed(Some("b"), 500),
            keyed(Some("b"), 1500),
            keyed(Some("c"), 100),
        ];
        let cursor = Cursor::Composite {
            group: "b".to_string(),
            timestamp: Timestamp::from_millis(500).unwrap(),
        };
        let kept = filter_rows(rows, Some(&cursor));

        let order: Vec<(String, i64)> = kept
            .iter()
            .map(|r| (r.group_str().to_string(), r.row.timestamp.timestamp_millis()))
            .collect();
        assert_eq!(
            order,
            vec![("b".to_string(), 1500), ("c".to_string(), 100)]
        );
    }

    #[test]
    fn test_take_rows_over_read() {
        let rows: Vec<_> = (0..4).map(|i| keyed(None, i * 1000)).collect();

        let (page, has_more) = take_rows(rows.clone(), 3);
        assert_eq!(page.len(), 3);
        assert!(has_more);

        let (page, has_more) = take_rows(rows, 4);
        assert_eq!(page.len(), 4);
        assert!(!has_more);
    }
}
