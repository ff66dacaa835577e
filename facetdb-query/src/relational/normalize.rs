//! Normalizer for relational result rows
//!
//! Each row map becomes one canonical row. A missing timestamp or value is
//! a malformed payload and fails the request; an unparseable metadata blob
//! only degrades that row to empty metadata, with a diagnostic logged.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::warn;

use facetdb_core::error::{FacetError, FacetResult};
use facetdb_core::metric::MetricName;
use facetdb_core::series::{CanonicalRow, DefinitionId, KeyedRow};
use facetdb_core::time::Timestamp;

use super::executor::{SqlRow, SqlValue};

/// Convert one result row into a keyed canonical row. The group key, when
/// the statement computed one, arrives in the `group_key` column.
pub fn canonical_row(row: &SqlRow) -> FacetResult<KeyedRow> {
    let metric = match row.get("metric_name") {
        Some(SqlValue::Text(name)) => MetricName::from(name.as_str()),
        _ => return Err(FacetError::malformed("row is missing metric_name")),
    };

    let definition_id = match row.get("definition_id") {
        Some(SqlValue::Text(id)) => Some(DefinitionId::new(id.clone())),
        _ => None,
    };

    let timestamp = parse_timestamp(row)?;
    let value = parse_value(row)?;

    let metadata = match row.get("value_meta") {
        Some(SqlValue::Text(blob)) if !blob.is_empty() => parse_metadata(blob, &definition_id),
        _ => BTreeMap::new(),
    };

    let group = match row.get("group_key") {
        Some(SqlValue::Text(key)) => Some(key.clone()),
        _ => None,
    };

    Ok(KeyedRow::new(
        metric,
        group,
        CanonicalRow::new(definition_id, timestamp, value).with_metadata(metadata),
    ))
}

/// Timestamps arrive as a native timestamp cell or as ISO-8601 text
fn parse_timestamp(row: &SqlRow) -> FacetResult<Timestamp> {
    match row.get("time_stamp") {
        Some(SqlValue::Timestamp(ts)) => Ok(*ts),
        Some(SqlValue::Text(text)) => Timestamp::from_rfc3339(text)
            .map_err(|_| FacetError::malformed(format!("unparseable time_stamp: '{}'", text))),
        other => Err(FacetError::malformed(format!(
            "row has no usable time_stamp: {:?}",
            other
        ))),
    }
}

fn parse_value(row: &SqlRow) -> FacetResult<f64> {
    match row.get("value") {
        Some(SqlValue::Float(f)) => Ok(*f),
        Some(SqlValue::Int(i)) => Ok(*i as f64),
        other => Err(FacetError::malformed(format!(
            "row has no numeric value: {:?}",
            other
        ))),
    }
}

/// Parse the embedded metadata blob; failure degrades to empty metadata for
/// just this row, never the whole request.
fn parse_metadata(blob: &str, definition: &Option<DefinitionId>) -> BTreeMap<String, String> {
    match serde_json::from_str::<BTreeMap<String, JsonValue>>(blob) {
        Ok(parsed) => parsed
            .into_iter()
            .map(|(key, value)| match value {
                JsonValue::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect(),
        Err(error) => {
            warn!(
                definition = definition.as_ref().map(|d| d.as_str()).unwrap_or("<none>"),
                %error,
                "discarding unparseable value_meta blob"
            );
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, SqlValue)]) -> SqlRow {
        cells
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn base_row() -> SqlRow {
        row(&[
            ("metric_name", SqlValue::Text("cpu.idle".to_string())),
            ("definition_id", SqlValue::Text("d1".to_string())),
            (
                "time_stamp",
                SqlValue::Timestamp(Timestamp::from_millis(1000).unwrap()),
            ),
            ("value", SqlValue::Float(99.5)),
            ("value_meta", SqlValue::Null),
        ])
    }

    #[test]
    fn test_canonical_row_happy_path() {
        let keyed = canonical_row(&base_row()).unwrap();

        assert_eq!(keyed.metric, "cpu.idle");
        assert!(keyed.group.is_none());
        assert_eq!(keyed.row.definition_id.as_ref().unwrap().as_str(), "d1");
        assert_eq!(keyed.row.timestamp.timestamp_millis(), 1000);
        assert_eq!(keyed.row.value, 99.5);
        assert!(keyed.row.value_metadata.is_empty());
    }

    #[test]
    fn test_group_key_column_is_carried() {
        let mut cells = base_row();
        cells.insert(
            "group_key".to_string(),
            SqlValue::Text("server1|us".to_string()),
        );
        let keyed = canonical_row(&cells).unwrap();
        assert_eq!(keyed.group.as_deref(), Some("server1|us"));
    }

    #[test]
    fn test_text_timestamp_and_integer_value() {
        let mut cells = base_row();
        cells.insert(
            "time_stamp".to_string(),
            SqlValue::Text("1970-01-01T00:00:02+00:00".to_string()),
        );
        cells.insert("value".to_string(), SqlValue::Int(42));
        let keyed = canonical_row(&cells).unwrap();

        assert_eq!(keyed.row.timestamp.timestamp_millis(), 2000);
        assert_eq!(keyed.row.value, 42.0);
    }

    #[test]
    fn test_missing_timestamp_or_value_is_malformed() {
        let mut no_time = base_row();
        no_time.insert("time_stamp".to_string(), SqlValue::Null);
        assert_eq!(
            canonical_row(&no_time).unwrap_err().category(),
            "malformed_payload"
        );

        let mut no_value = base_row();
        no_value.insert("value".to_string(), SqlValue::Text("high".to_string()));
        assert_eq!(
            canonical_row(&no_value).unwrap_err().category(),
            "malformed_payload"
        );
    }

    #[test]
    fn test_metadata_blob_parses_or_degrades() {
        let mut with_meta = base_row();
        with_meta.insert(
            "value_meta".to_string(),
            SqlValue::Text(r#"{"unit": "percent", "samples": 3}"#.to_string()),
        );
        let keyed = canonical_row(&with_meta).unwrap();
        assert_eq!(
            keyed.row.value_metadata.get("unit").map(String::as_str),
            Some("percent")
        );
        assert_eq!(
            keyed.row.value_metadata.get("samples").map(String::as_str),
            Some("3")
        );

        // Garbage blob: row survives with empty metadata
        let mut bad_meta = base_row();
        bad_meta.insert(
            "value_meta".to_string(),
            SqlValue::Text("{not json".to_string()),
        );
        let keyed = canonical_row(&bad_meta).unwrap();
        assert!(keyed.row.value_metadata.is_empty());
    }
}
