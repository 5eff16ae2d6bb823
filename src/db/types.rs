//! Query result and catalog types.
//!
//! Defines the structures returned by database clients and serialized by the
//! HTTP layer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Raw output of one statement, before any row cap is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in result-set order. May contain duplicates.
    pub columns: Vec<String>,

    /// Rows of data, each with one value per column.
    pub rows: Vec<Row>,

    /// Time spent preparing, executing and fetching the statement.
    pub execution_time: Duration,
}

impl ResultSet {
    /// Creates a result set with the given columns and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// A row keyed by column name, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Response body of a successful query.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Column names in result-set order.
    pub columns: Vec<String>,

    /// Returned rows, at most the row cap.
    pub rows: Vec<Record>,

    /// Number of rows actually returned (after truncation).
    pub row_count: usize,

    /// Whether rows beyond the cap were dropped.
    pub has_more: bool,

    /// Statement execution time in seconds.
    #[serde(serialize_with = "duration_secs")]
    pub execution_time: Duration,
}

impl QueryResult {
    /// Builds a response from a raw result set, keeping at most `max_rows` rows.
    pub fn from_result_set(set: ResultSet, max_rows: usize) -> Self {
        let ResultSet {
            columns,
            mut rows,
            execution_time,
        } = set;

        let has_more = rows.len() > max_rows;
        rows.truncate(max_rows);

        let rows: Vec<Record> = rows.iter().map(|row| to_record(&columns, row)).collect();

        Self {
            row_count: rows.len(),
            columns,
            rows,
            has_more,
            execution_time,
        }
    }
}

/// Pairs column names with values. A repeated column name keeps its first
/// position and its last value.
fn to_record(columns: &[String], row: &[Value]) -> Record {
    columns
        .iter()
        .zip(row)
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

fn duration_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// A single cell decoded from the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value, also used for dates, times and identifiers.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// JSON or JSONB document.
    Json(serde_json::Value),

    /// One-dimensional array, elements may be NULL.
    Array(Vec<Value>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to JSON. Bytes become standard base64; non-finite
    /// floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(STANDARD.encode(b)),
            Value::Json(v) => v.clone(),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
        }
    }
}

/// One entry of `GET /tables`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableSummary {
    pub table_name: String,
    pub column_count: i64,
}

/// One entry of `GET /tables/{table_name}/columns`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnDetail {
    pub column_name: String,
    pub data_type: String,
    /// Catalog flag, `"YES"` or `"NO"`.
    pub is_nullable: String,
}

/// Body of `GET /database-info`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub table_count: i64,
    /// Human-readable size, e.g. `"8537 kB"`.
    pub database_size: String,
    pub postgres_version: String,
}
