//! Statement text for the time-series read API
//!
//! Discovery uses `SHOW SERIES`; measurements use a `SELECT ... GROUP BY *`.
//! The tenant predicate rides on the internal `_tenant` dimension and is
//! built from the already-validated [`TenantId`], never from raw caller
//! text. No pagination is pushed into these statements: discovery always
//! returns the full matching catalog and the pagination engine trims it
//! downstream.

use facetdb_core::dimension::{DimensionName, TENANT_DIMENSION};
use facetdb_core::metric::MetricName;
use facetdb_core::query::MeasurementQuery;
use facetdb_core::tenant::TenantId;

/// Build a series-discovery statement. With `dimension` set, an existence
/// filter restricts the catalog to series carrying that dimension.
pub fn show_series(
    tenant: &TenantId,
    metric: Option<&MetricName>,
    dimension: Option<&DimensionName>,
) -> String {
    let mut statement = String::from("SHOW SERIES");
    if let Some(metric) = metric {
        statement.push_str(&format!(" FROM \"{}\"", metric.as_str()));
    }
    statement.push_str(&format!(
        " WHERE \"{}\" = '{}'",
        TENANT_DIMENSION,
        escape_value(tenant.as_str())
    ));
    if let Some(dimension) = dimension {
        statement.push_str(&format!(" AND \"{}\" <> ''", dimension.as_str()));
    }
    statement
}

/// Build the measurement read for one query. Filters become dimension
/// equality predicates; `GROUP BY *` keeps each underlying series separate
/// so the normalizer sees per-definition dimension sets.
pub fn select_measurements(query: &MeasurementQuery) -> String {
    let mut statement = String::from("SELECT time, value FROM ");
    match &query.metric {
        Some(metric) => statement.push_str(&format!("\"{}\"", metric.as_str())),
        None => statement.push_str("/.*/"),
    }

    statement.push_str(&format!(
        " WHERE \"{}\" = '{}'",
        TENANT_DIMENSION,
        escape_value(query.tenant.as_str())
    ));
    for (name, value) in query.filters.iter() {
        statement.push_str(&format!(
            " AND \"{}\" = '{}'",
            name.as_str(),
            escape_value(value)
        ));
    }

    statement.push_str(&format!(
        " AND time >= '{}'",
        query.window.start.to_rfc3339()
    ));
    if let Some(end) = query.window.end {
        statement.push_str(&format!(" AND time <= '{}'", end.to_rfc3339()));
    }

    statement.push_str(" GROUP BY *");
    statement
}

/// Single quotes inside a string literal are escaped by doubling.
fn escape_value(value: &str) -> String {
    value.replace('\'', "''")
}
