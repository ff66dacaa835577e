//! Time-series repository tests over an in-memory backend
//!
//! The fake read API returns a fixed response document, so these suites
//! exercise the full normalize → group → paginate pipeline exactly as a
//! live backend would drive it: determinism, pagination completeness,
//! cursor exclusivity, grouping partition and merge collapse.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use facetdb_core::dimension::{DimensionName, DimensionSet};
use facetdb_core::error::FacetResult;
use facetdb_core::metric::MetricName;
use facetdb_core::page::PageRequest;
use facetdb_core::query::{GroupBy, MeasurementQuery};
use facetdb_core::store::MetricStore;
use facetdb_core::tenant::TenantId;
use facetdb_core::time::{QueryWindow, Timestamp};
use facetdb_query::timeseries::transport::SeriesApi;
use facetdb_query::timeseries::TimeSeriesRepository;

/// Fake read API answering every statement with one canned document
struct FakeSeriesApi {
    response: String,
}

#[async_trait]
impl SeriesApi for FakeSeriesApi {
    async fn query(&self, _statement: &str) -> FacetResult<String> {
        Ok(self.response.clone())
    }
}

fn repository(document: Value) -> TimeSeriesRepository {
    TimeSeriesRepository::new(Arc::new(FakeSeriesApi {
        response: document.to_string(),
    }))
}

fn tenant() -> TenantId {
    TenantId::new("acme").unwrap()
}

fn metric() -> MetricName {
    MetricName::new("cpu.idle").unwrap()
}

/// SHOW SERIES document with one series per host value
fn host_discovery_document(hosts: &[&str]) -> Value {
    let values: Vec<Value> = hosts.iter().map(|h| json!(["acme", h])).collect();
    json!({"results": [{"series": [{
        "name": "cpu.idle",
        "columns": ["_tenant", "host"],
        "values": values
    }]}]})
}

/// Measurement document: one series per (host, row count) entry, rows at
/// 1s intervals starting from 1000ms
fn measurement_document(series: &[(&str, usize)]) -> Value {
    let rendered: Vec<Value> = series
        .iter()
        .map(|(host, count)| {
            let values: Vec<Value> = (0..*count)
                .map(|i| json!([1000 + i as i64 * 1000, i as f64]))
                .collect();
            json!({
                "name": "cpu.idle",
                "tags": {"_tenant": "acme", "host": host},
                "columns": ["time", "value"],
                "values": values
            })
        })
        .collect();
    json!({"results": [{"series": rendered}]})
}

fn measurement_query(group_by: GroupBy, merge: bool, limit: usize) -> MeasurementQuery {
    MeasurementQuery {
        tenant: tenant(),
        metric: Some(metric()),
        filters: DimensionSet::new(),
        window: QueryWindow::since(Timestamp::from_millis(0).unwrap()),
        offset: None,
        limit,
        group_by,
        merge_metrics: merge,
    }
}

#[tokio::test]
async fn dimension_values_paginate_per_the_contract_example() {
    // Three series for cpu.idle: {host: a}, {host: b}, {host: c}
    let repo = repository(host_discovery_document(&["a", "b", "c"]));
    let dimension = DimensionName::new("host").unwrap();

    let first = repo
        .find_dimension_values(
            &tenant(),
            Some(&metric()),
            &dimension,
            &PageRequest::new(Some(String::new()), 2).unwrap(),
        )
        .await
        .unwrap();
    let values: Vec<&str> = first.items.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["a", "b"]);
    assert!(first.has_more);
    assert_eq!(first.next_offset().as_deref(), Some("b"));

    let second = repo
        .find_dimension_values(
            &tenant(),
            Some(&metric()),
            &dimension,
            &PageRequest::new(Some("b".to_string()), 2).unwrap(),
        )
        .await
        .unwrap();
    let values: Vec<&str> = second.items.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["c"]);
    assert!(!second.has_more);
}

#[tokio::test]
async fn dimension_names_are_deterministic_and_deduplicated() {
    let document = json!({"results": [{"series": [{
        "name": "cpu.idle",
        "columns": ["_tenant", "region", "host"],
        "values": [["acme", "us", "a"], ["acme", "eu", "b"]]
    }]}]});
    let repo = repository(document);

    let page = repo
        .find_dimension_names(&tenant(), Some(&metric()), &PageRequest::first(10).unwrap())
        .await
        .unwrap();
    let names: Vec<&str> = page
        .items
        .iter()
        .map(|r| r.dimension_name.as_str())
        .collect();
    // Both series carry both names; dedup and lexicographic order apply,
    // and the internal tenant dimension never appears
    assert_eq!(names, vec!["host", "region"]);

    let again = repo
        .find_dimension_names(&tenant(), Some(&metric()), &PageRequest::first(10).unwrap())
        .await
        .unwrap();
    assert_eq!(page.items, again.items);
}

#[tokio::test]
async fn empty_catalog_is_a_well_formed_empty_page() {
    let repo = repository(json!({"results": [{}]}));
    let page = repo
        .find_dimension_names(&tenant(), Some(&metric()), &PageRequest::first(5).unwrap())
        .await
        .unwrap();
    assert!(page.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn grouped_query_with_limit_one_truncates_inside_first_group() {
    // 150 rows for host a, 80 for host b; limit 1 returns one series with
    // exactly one row plus the truncation signal
    let repo = repository(measurement_document(&[("a", 150), ("b", 80)]));
    let query = measurement_query(GroupBy::from_names(["host"]).unwrap(), false, 1);

    let page = repo.find_measurements(&query).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].dimensions.as_ref().unwrap().get("host"), Some("a"));
    assert_eq!(page.items[0].len(), 1);
    assert!(page.has_more);
}

#[tokio::test]
async fn grouped_pagination_chains_without_gaps_or_duplicates() {
    let repo = repository(measurement_document(&[("a", 5), ("b", 3)]));

    let all = repo
        .find_measurements(&measurement_query(
            GroupBy::from_names(["host"]).unwrap(),
            false,
            100,
        ))
        .await
        .unwrap();
    let full: Vec<(String, i64)> = flatten(&all.items);
    assert_eq!(full.len(), 8);
    assert!(!all.has_more);

    let mut chained = Vec::new();
    let mut offset: Option<String> = None;
    loop {
        let mut query = measurement_query(GroupBy::from_names(["host"]).unwrap(), false, 3);
        query.offset = offset.clone();
        let page = repo.find_measurements(&query).await.unwrap();
        chained.extend(flatten(&page.items));
        match page.next_offset() {
            Some(next) => offset = Some(next),
            None => break,
        }
    }
    assert_eq!(chained, full);
}

#[tokio::test]
async fn ungrouped_cursor_is_strictly_exclusive() {
    let repo = repository(measurement_document(&[("a", 4)]));

    let mut query = measurement_query(GroupBy::None, false, 10);
    query.offset = Some("2000".to_string());
    let page = repo.find_measurements(&query).await.unwrap();

    let times: Vec<i64> = flatten(&page.items).into_iter().map(|(_, t)| t).collect();
    // The row at exactly 2000ms is never returned
    assert_eq!(times, vec![3000, 4000]);
}

#[tokio::test]
async fn ambiguous_definitions_fail_without_group_or_merge() {
    let repo = repository(measurement_document(&[("a", 2), ("b", 2)]));

    let err = repo
        .find_measurements(&measurement_query(GroupBy::None, false, 10))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "ambiguous_metric");
}

#[tokio::test]
async fn merge_collapses_definitions_into_one_series() {
    let repo = repository(measurement_document(&[("a", 2), ("b", 3)]));

    let mut query = measurement_query(GroupBy::None, true, 10);
    let mut filters = HashMap::new();
    filters.insert("env".to_string(), "prod".to_string());
    query.filters = DimensionSet::from_map(filters).unwrap();

    let page = repo.find_measurements(&query).await.unwrap();
    assert_eq!(page.len(), 1);
    let merged = &page.items[0];
    assert!(merged.id.is_none());
    // Reported dimensions are the caller's filter verbatim
    assert_eq!(merged.dimensions.as_ref().unwrap().get("env"), Some("prod"));
    assert_eq!(merged.len(), 5);
    assert!(merged.is_time_ordered());
}

#[tokio::test]
async fn wildcard_group_by_resolves_dimensions_locally() {
    let repo = repository(measurement_document(&[("a", 2), ("b", 1)]));

    let query = measurement_query(GroupBy::from_names(["*"]).unwrap(), false, 10);
    let page = repo.find_measurements(&query).await.unwrap();

    assert_eq!(page.len(), 2);
    let total: usize = page.items.iter().map(|s| s.len()).sum();
    assert_eq!(total, 3);
    for series in &page.items {
        assert!(series.id.is_some());
        let host = series.dimensions.as_ref().unwrap().get("host").unwrap();
        // Partition: every row in a series shares that series' definition
        assert!(series
            .measurements
            .iter()
            .all(|row| row.definition_id.as_ref().unwrap().as_str().contains(host)));
    }
}

#[tokio::test]
async fn backend_error_member_propagates() {
    let repo = repository(json!({"results": [{"error": "shard down"}]}));
    let err = repo
        .find_measurements(&measurement_query(GroupBy::None, false, 10))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "backend");
}

fn flatten(series: &[facetdb_core::series::MeasurementSeries]) -> Vec<(String, i64)> {
    series
        .iter()
        .flat_map(|s| {
            let host = s
                .dimensions
                .as_ref()
                .and_then(|d| d.get("host"))
                .unwrap_or("")
                .to_string();
            s.measurements
                .iter()
                .map(move |row| (host.clone(), row.timestamp.timestamp_millis()))
        })
        .collect()
}
