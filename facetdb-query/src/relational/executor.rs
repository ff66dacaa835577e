//! Backend reader for the relational columnar store
//!
//! A statement is text plus its positional bind values; the executor runs
//! one round trip and hands back loosely typed rows. The pooled connection
//! is acquired inside the call and the guard releases it on every exit
//! path. No retries here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use std::collections::BTreeMap;

use facetdb_core::error::{FacetError, FacetResult};
use facetdb_core::time::Timestamp;

/// One loosely typed cell of a result row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Timestamp(Timestamp),
    Null,
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One result row: column name to cell
pub type SqlRow = BTreeMap<String, SqlValue>;

/// A parameterized statement with its bind values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<SqlValue>,
}

/// Executes one prepared statement per call. Tests substitute an in-memory
/// fake; production uses the Postgres pool.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn fetch(&self, statement: &SqlStatement) -> FacetResult<Vec<SqlRow>>;
}

/// sqlx-backed Postgres executor
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> FacetResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| FacetError::backend(format!("Relational connect failed: {}", e)))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn fetch(&self, statement: &SqlStatement) -> FacetResult<Vec<SqlRow>> {
        // Scoped acquisition: the guard returns the connection to the pool
        // when it drops, success or failure alike.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| FacetError::backend(format!("Connection acquire failed: {}", e)))?;

        let mut query = sqlx::query(&statement.text);
        for param in &statement.params {
            query = match param {
                SqlValue::Text(s) => query.bind(s.clone()),
                SqlValue::Int(i) => query.bind(*i),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Timestamp(ts) => query.bind(ts.datetime()),
                SqlValue::Null => query.bind(Option::<String>::None),
            };
        }

        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| FacetError::backend(format!("Query execution failed: {}", e)))?;

        Ok(rows.iter().map(decode_row).collect())
    }
}

fn decode_row(row: &PgRow) -> SqlRow {
    let mut out = SqlRow::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = if let Ok(Some(ts)) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
            SqlValue::Timestamp(Timestamp::from_datetime(ts))
        } else if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(index) {
            SqlValue::Float(f)
        } else if let Ok(Some(i)) = row.try_get::<Option<i64>, _>(index) {
            SqlValue::Int(i)
        } else if let Ok(Some(s)) = row.try_get::<Option<String>, _>(index) {
            SqlValue::Text(s)
        } else {
            SqlValue::Null
        };
        out.insert(column.name().to_string(), value);
    }
    out
}
