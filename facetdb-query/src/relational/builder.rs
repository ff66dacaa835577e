//! Parameterized SQL for the relational columnar store
//!
//! Placeholders and their bound values are appended in one step through
//! [`SqlBuilder::bind`], so statement text and parameter list cannot drift.
//! Dimension names reach this module only as validated [`DimensionName`]s,
//! which the core has already checked against the reserved schema columns;
//! quoting them as identifiers is therefore safe.

use facetdb_core::cursor::Cursor;
use facetdb_core::dimension::DimensionName;
use facetdb_core::error::FacetResult;
use facetdb_core::metric::MetricName;
use facetdb_core::query::{GroupingMode, MeasurementQuery, GROUP_KEY_SEPARATOR};
use facetdb_core::series::DefinitionId;
use facetdb_core::tenant::TenantId;

use super::executor::{SqlStatement, SqlValue};

/// Accumulates statement text and bind values together
struct SqlBuilder {
    text: String,
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    /// Append a bind value and return its positional placeholder
    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn finish(self) -> SqlStatement {
        SqlStatement {
            text: self.text,
            params: self.params,
        }
    }
}

/// Discovery of dimension names from the definitions side-table. Ordering
/// and pagination happen in-process, per the shared pagination engine.
pub fn dimension_names(
    table: &str,
    tenant: &TenantId,
    metric: Option<&MetricName>,
) -> SqlStatement {
    let mut builder = SqlBuilder::new(&format!(
        "SELECT DISTINCT metric_name, dimension_name FROM {} WHERE tenant_id = ",
        table
    ));
    let placeholder = builder.bind(SqlValue::Text(tenant.as_str().to_string()));
    builder.push(&placeholder);
    if let Some(metric) = metric {
        let placeholder = builder.bind(SqlValue::Text(metric.as_str().to_string()));
        builder.push(&format!(" AND metric_name = {}", placeholder));
    }
    builder.finish()
}

/// Discovery of one dimension's values from the definitions side-table
pub fn dimension_values(
    table: &str,
    tenant: &TenantId,
    metric: Option<&MetricName>,
    dimension: &DimensionName,
) -> SqlStatement {
    let mut builder = SqlBuilder::new(&format!(
        "SELECT DISTINCT metric_name, dimension_name, dimension_value FROM {} WHERE tenant_id = ",
        table
    ));
    let placeholder = builder.bind(SqlValue::Text(tenant.as_str().to_string()));
    builder.push(&placeholder);
    if let Some(metric) = metric {
        let placeholder = builder.bind(SqlValue::Text(metric.as_str().to_string()));
        builder.push(&format!(" AND metric_name = {}", placeholder));
    }
    let placeholder = builder.bind(SqlValue::Text(dimension.as_str().to_string()));
    builder.push(&format!(" AND dimension_name = {}", placeholder));
    builder.finish()
}

/// The measurement read: filters, cursor clause per grouping mode, group
/// ordering, and the limit+1 over-read.
pub fn measurements(table: &str, query: &MeasurementQuery) -> FacetResult<SqlStatement> {
    let mode = query.mode();
    let cursor = query.cursor()?;

    let mut builder = SqlBuilder::new(
        "SELECT metric_name, definition_id, time_stamp, value, value_meta",
    );
    let group_expr = group_expression(&mode);
    if let Some(expr) = &group_expr {
        builder.push(&format!(", {} AS group_key", expr));
    }
    builder.push(&format!(" FROM {} WHERE tenant_id = ", table));
    let placeholder = builder.bind(SqlValue::Text(query.tenant.as_str().to_string()));
    builder.push(&placeholder);

    if let Some(metric) = &query.metric {
        let placeholder = builder.bind(SqlValue::Text(metric.as_str().to_string()));
        builder.push(&format!(" AND metric_name = {}", placeholder));
    }

    // Unordered conjunction of equality predicates, one per filter; the
    // quoted identifier is the dimension's own (validated) name.
    for (name, value) in query.filters.iter() {
        let placeholder = builder.bind(SqlValue::Text(value.to_string()));
        builder.push(&format!(" AND \"{}\" = {}", name.as_str(), placeholder));
    }

    let placeholder = builder.bind(SqlValue::Timestamp(query.window.start));
    builder.push(&format!(" AND time_stamp >= {}", placeholder));
    if let Some(end) = query.window.end {
        let placeholder = builder.bind(SqlValue::Timestamp(end));
        builder.push(&format!(" AND time_stamp <= {}", placeholder));
    }

    if let Some(cursor) = cursor {
        push_cursor_clause(&mut builder, &cursor, group_expr.as_deref());
    }

    if group_expr.is_some() {
        builder.push(" ORDER BY group_key ASC, time_stamp ASC");
    } else {
        builder.push(" ORDER BY time_stamp ASC");
    }

    // Over-read by one so truncation is detectable without a second query
    let placeholder = builder.bind(SqlValue::Int(query.limit as i64 + 1));
    builder.push(&format!(" LIMIT {}", placeholder));

    Ok(builder.finish())
}

/// Resolve the full dimension sets of the observed definition identities
pub fn resolve_definitions(
    table: &str,
    tenant: &TenantId,
    definitions: &[DefinitionId],
) -> SqlStatement {
    let mut builder = SqlBuilder::new(&format!(
        "SELECT definition_id, dimension_name, dimension_value FROM {} WHERE tenant_id = ",
        table
    ));
    let placeholder = builder.bind(SqlValue::Text(tenant.as_str().to_string()));
    builder.push(&placeholder);

    builder.push(" AND definition_id IN (");
    for (index, definition) in definitions.iter().enumerate() {
        let placeholder = builder.bind(SqlValue::Text(definition.as_str().to_string()));
        if index > 0 {
            builder.push(", ");
        }
        builder.push(&placeholder);
    }
    builder.push(")");
    builder.finish()
}

/// The SQL rendering of the active grouping key, or none when the query
/// does not group (merge included).
///
/// The expression is pinned to the `"C"` collation: the in-process side
/// (cursor admission, row sort, cursor derivation) compares group identities
/// as bytes, and a locale-collated database order would disagree with it on
/// mixed-case keys, re-admitting already-delivered groups on the next page.
fn group_expression(mode: &GroupingMode) -> Option<String> {
    match mode {
        GroupingMode::SingleDefinition | GroupingMode::Merged => None,
        GroupingMode::ByDimensions(names) => {
            // Same separator the in-process engine uses; missing dimensions
            // contribute empty segments rather than collapsing positions.
            let columns = names
                .iter()
                .map(|name| format!("coalesce(\"{}\", '')", name.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!(
                "concat_ws('{}', {}) COLLATE \"C\"",
                GROUP_KEY_SEPARATOR, columns
            ))
        }
        GroupingMode::ByDefinition => Some("definition_id COLLATE \"C\"".to_string()),
    }
}

fn push_cursor_clause(builder: &mut SqlBuilder, cursor: &Cursor, group_expr: Option<&str>) {
    match (cursor, group_expr) {
        (Cursor::Timestamp(ts), _) => {
            let placeholder = builder.bind(SqlValue::Timestamp(*ts));
            builder.push(&format!(" AND time_stamp > {}", placeholder));
        }
        (Cursor::Composite { group, timestamp }, Some(expr)) => {
            let group_placeholder = builder.bind(SqlValue::Text(group.clone()));
            let time_placeholder = builder.bind(SqlValue::Timestamp(*timestamp));
            builder.push(&format!(
                " AND ({expr} > {g} OR ({expr} = {g} AND time_stamp > {t}))",
                expr = expr,
                g = group_placeholder,
                t = time_placeholder
            ));
        }
        // Composite cursors only reach a grouped query; the query's own
        // cursor parsing enforces the pairing.
        (Cursor::Composite { timestamp, .. }, None) => {
            let placeholder = builder.bind(SqlValue::Timestamp(*timestamp));
            builder.push(&format!(" AND time_stamp > {}", placeholder));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetdb_core::dimension::DimensionSet;
    use facetdb_core::query::GroupBy;
    use facetdb_core::time::{QueryWindow, Timestamp};
    use std::collections::HashMap;

    fn base_query() -> MeasurementQuery {
        let mut filters = HashMap::new();
        filters.insert("host".to_string(), "server1".to_string());
        MeasurementQuery {
            tenant: TenantId::new("acme").unwrap(),
            metric: Some(MetricName::new("cpu.idle").unwrap()),
            filters: DimensionSet::from_map(filters).unwrap(),
            window: QueryWindow::new(
                Timestamp::from_millis(0).unwrap(),
                Some(Timestamp::from_millis(60_000).unwrap()),
            )
            .unwrap(),
            offset: None,
            limit: 25,
            group_by: GroupBy::None,
            merge_metrics: false,
        }
    }

    #[test]
    fn test_dimension_names_statement() {
        let statement = dimension_names(
            "metric_definitions",
            &TenantId::new("acme").unwrap(),
            Some(&MetricName::new("cpu.idle").unwrap()),
        );
        assert_eq!(
            statement.text,
            "SELECT DISTINCT metric_name, dimension_name FROM metric_definitions \
             WHERE tenant_id = $1 AND metric_name = $2"
        );
        assert_eq!(
            statement.params,
            vec![
                SqlValue::Text("acme".to_string()),
                SqlValue::Text("cpu.idle".to_string()),
            ]
        );
    }

    #[test]
    fn test_dimension_names_catalog_scan_omits_metric_predicate() {
        let statement = dimension_names("metric_definitions", &TenantId::new("acme").unwrap(), None);
        assert!(!statement.text.contains("metric_name ="));
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_measurements_ungrouped_statement() {
        let statement = measurements("measurements", &base_query()).unwrap();

        assert!(statement.text.contains("AND metric_name = $2"));
        assert!(statement.text.contains("AND \"host\" = $3"));
        assert!(statement.text.contains("AND time_stamp >= $4"));
        assert!(statement.text.contains("AND time_stamp <= $5"));
        assert!(statement.text.ends_with("ORDER BY time_stamp ASC LIMIT $6"));
        assert!(!statement.text.contains("group_key"));
        // Over-read: limit 25 binds as 26
        assert_eq!(statement.params[5], SqlValue::Int(26));
    }

    #[test]
    fn test_measurements_plain_cursor_clause() {
        let mut query = base_query();
        query.offset = Some("30000".to_string());
        let statement = measurements("measurements", &query).unwrap();

        assert!(statement.text.contains("AND time_stamp > $6"));
        assert_eq!(
            statement.params[5],
            SqlValue::Timestamp(Timestamp::from_millis(30_000).unwrap())
        );
    }

    #[test]
    fn test_measurements_grouped_by_dimensions() {
        let mut query = base_query();
        query.group_by = GroupBy::from_names(["host", "region"]).unwrap();
        query.offset = Some("30000@server1|us".to_string());
        let statement = measurements("measurements", &query).unwrap();

        let expr = "concat_ws('|', coalesce(\"host\", ''), coalesce(\"region\", '')) COLLATE \"C\"";
        assert!(statement.text.contains(&format!("{} AS group_key", expr)));
        // Composite keep-set: later group, or same group and later time
        assert!(statement.text.contains(&format!(
            "AND ({expr} > $6 OR ({expr} = $6 AND time_stamp > $7))",
            expr = expr
        )));
        assert!(statement
            .text
            .ends_with("ORDER BY group_key ASC, time_stamp ASC LIMIT $8"));
        assert_eq!(statement.params[5], SqlValue::Text("server1|us".to_string()));
    }

    #[test]
    fn test_measurements_wildcard_group_keys_on_definition() {
        let mut query = base_query();
        query.group_by = GroupBy::from_names(["*"]).unwrap();
        query.offset = Some("1000@def-7".to_string());
        let statement = measurements("measurements", &query).unwrap();

        assert!(statement
            .text
            .contains("definition_id COLLATE \"C\" AS group_key"));
        assert!(statement.text.contains(
            "AND (definition_id COLLATE \"C\" > $6 OR \
             (definition_id COLLATE \"C\" = $6 AND time_stamp > $7))"
        ));
    }

    #[test]
    fn test_group_comparisons_pin_byte_order_collation() {
        // Locale collations order 'B' after 'a'; the engine compares group
        // keys as bytes, so every SQL comparison of the group expression must
        // carry the "C" collation or a truncated page's cursor re-admits
        // groups the previous page already delivered.
        let mut query = base_query();
        query.group_by = GroupBy::from_names(["host"]).unwrap();
        query.offset = Some("1000@a".to_string());
        let statement = measurements("measurements", &query).unwrap();

        let occurrences = statement.text.matches("COLLATE \"C\"").count();
        // Select alias, strict-greater arm, equality arm
        assert_eq!(occurrences, 3);
        assert!(statement
            .text
            .ends_with("ORDER BY group_key ASC, time_stamp ASC LIMIT $8"));
    }

    #[test]
    fn test_merge_suppresses_group_ordering() {
        let mut query = base_query();
        query.group_by = GroupBy::from_names(["host"]).unwrap();
        query.merge_metrics = true;
        let statement = measurements("measurements", &query).unwrap();

        assert!(!statement.text.contains("group_key"));
        assert!(statement.text.contains("ORDER BY time_stamp ASC"));
    }

    #[test]
    fn test_resolve_definitions_statement() {
        let ids = vec![DefinitionId::new("d1"), DefinitionId::new("d2")];
        let statement =
            resolve_definitions("metric_definitions", &TenantId::new("acme").unwrap(), &ids);

        assert!(statement
            .text
            .ends_with("AND definition_id IN ($2, $3)"));
        assert_eq!(statement.params.len(), 3);
    }
}
