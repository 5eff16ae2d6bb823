//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait using sqlx. Every call opens its own connection and closes it before
//! returning; no connection is ever shared between requests.

use crate::config::ConnectionConfig;
use crate::db::{ColumnDetail, DatabaseClient, DatabaseInfo, ResultSet, Row, TableSummary, Value};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use sqlx::postgres::types::{Oid, PgInterval, PgTimeTz};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgDatabaseError, PgRow, PgValueFormat};
use sqlx::types::chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{
    Column as _, Connection as _, Executor as _, Row as _, Statement as _, TypeInfo as _,
    ValueRef as _,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Upper bound on establishing a connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL database client.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    config: ConnectionConfig,
}

impl PostgresClient {
    /// Creates a client for the given connection settings. No connection is
    /// opened until a request needs one.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(self.config.host())
            .port(self.config.port())
            .database(self.config.database())
            .username(self.config.user())
            .password(self.config.password())
            .application_name("sql-gateway")
    }

    /// Opens a fresh connection.
    async fn open(&self) -> Result<PgConnection> {
        let options = self.connect_options();

        let conn = tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            PgConnection::connect_with(&options),
        )
        .await
        .map_err(|_| {
            GatewayError::connection(format!(
                "Connection to {}:{} timed out after {CONNECT_TIMEOUT_SECS} seconds",
                self.config.host(),
                self.config.port()
            ))
        })?
        .map_err(|e| map_connection_error(e, &self.config))?;

        debug!("Opened connection to {}", self.config.display_string());
        Ok(conn)
    }
}

/// Closes a connection, logging instead of failing. Dropping a `PgConnection`
/// also tears down its socket, so a future cancelled mid-request still
/// releases it.
async fn release(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close connection cleanly: {e}");
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn ping(&self) -> Result<()> {
        let conn = self.open().await?;
        release(conn).await;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<TableSummary>> {
        let mut conn = self.open().await?;
        let result = fetch_tables(&mut conn).await;
        release(conn).await;
        result
    }

    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnDetail>> {
        let mut conn = self.open().await?;
        let result = fetch_columns(&mut conn, table_name).await;
        release(conn).await;
        result
    }

    async fn database_info(&self) -> Result<DatabaseInfo> {
        let mut conn = self.open().await?;
        let result = fetch_database_info(&mut conn).await;
        release(conn).await;
        result
    }

    async fn run_query(&self, sql: &str, statement_timeout: Duration) -> Result<ResultSet> {
        let mut conn = self.open().await?;
        let result = run_bounded(&mut conn, sql, statement_timeout).await;
        release(conn).await;
        result
    }
}

/// Runs one statement under a server-side `statement_timeout`.
///
/// The clock covers prepare, execute and fetch: sqlx returns rows only once
/// the server has streamed them, so there is no earlier point at which
/// execution alone has finished.
async fn run_bounded(
    conn: &mut PgConnection,
    sql: &str,
    statement_timeout: Duration,
) -> Result<ResultSet> {
    let set_timeout = format!("SET statement_timeout = {}", statement_timeout.as_millis());
    sqlx::query(&set_timeout)
        .execute(&mut *conn)
        .await
        .map_err(|e| GatewayError::internal(format!("Failed to set statement timeout: {e}")))?;

    let start = Instant::now();

    // One statement per prepare: the server refuses multi-command text here.
    let statement = (&mut *conn)
        .prepare(sql)
        .await
        .map_err(|e| GatewayError::execution(format_query_error(e)))?;

    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let pg_rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| GatewayError::execution(format_query_error(e)))?;

    let execution_time = start.elapsed();

    debug!(
        rows = pg_rows.len(),
        elapsed_ms = execution_time.as_millis() as u64,
        "Query executed"
    );

    let mut unmapped = BTreeSet::new();
    let rows: Vec<Row> = pg_rows
        .iter()
        .map(|row| convert_row(row, &mut unmapped))
        .collect();

    for index in unmapped {
        if let Some(column) = statement.columns().get(index) {
            warn!(
                column = column.name(),
                type_name = column.type_info().name(),
                "Column type has no JSON mapping, returning null"
            );
        }
    }

    Ok(ResultSet {
        columns,
        rows,
        execution_time,
    })
}

/// Fetches all base tables from the public schema with their column counts.
async fn fetch_tables(conn: &mut PgConnection) -> Result<Vec<TableSummary>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT
            t.table_name::text AS table_name,
            (SELECT count(*)
             FROM information_schema.columns c
             WHERE c.table_schema = 'public' AND c.table_name = t.table_name) AS column_count
        FROM information_schema.tables t
        WHERE t.table_schema = 'public' AND t.table_type = 'BASE TABLE'
        ORDER BY t.table_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| GatewayError::internal(format!("Failed to fetch tables: {e}")))?;

    Ok(rows
        .into_iter()
        .map(|(table_name, column_count)| TableSummary {
            table_name,
            column_count,
        })
        .collect())
}

/// Fetches columns for a specific table in physical order. Empty if the table
/// does not exist.
async fn fetch_columns(conn: &mut PgConnection, table_name: &str) -> Result<Vec<ColumnDetail>> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT
            column_name::text,
            data_type::text,
            is_nullable::text
        FROM information_schema.columns
        WHERE table_schema = 'public' AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        GatewayError::internal(format!("Failed to fetch columns for {table_name}: {e}"))
    })?;

    Ok(rows
        .into_iter()
        .map(|(column_name, data_type, is_nullable)| ColumnDetail {
            column_name,
            data_type,
            is_nullable,
        })
        .collect())
}

async fn fetch_database_info(conn: &mut PgConnection) -> Result<DatabaseInfo> {
    let (table_count, database_size, postgres_version): (i64, String, String) = sqlx::query_as(
        r#"
        SELECT
            (SELECT count(*) FROM information_schema.tables WHERE table_schema = 'public') AS table_count,
            pg_size_pretty(pg_database_size(current_database())) AS database_size,
            version() AS postgres_version
        "#,
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| GatewayError::internal(format!("Failed to fetch database info: {e}")))?;

    Ok(DatabaseInfo {
        table_count,
        database_size,
        postgres_version,
    })
}

/// Converts a sqlx PgRow to our Row type. Columns whose type has no JSON
/// mapping become NULL and their index is recorded in `unmapped`.
fn convert_row(row: &PgRow, unmapped: &mut BTreeSet<usize>) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            convert_value(row, i, col.type_info().name()).unwrap_or_else(|| {
                unmapped.insert(i);
                Value::Null
            })
        })
        .collect()
}

/// Decodes column `index` as `T`, mapping NULL and decode failures to `Value::Null`.
fn decode<'r, T>(row: &'r PgRow, index: usize, map: impl FnOnce(T) -> Value) -> Value
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(map)
        .unwrap_or(Value::Null)
}

/// Decodes a one-dimensional array column, mapping each element with `map`.
fn decode_array<'r, T>(row: &'r PgRow, index: usize, map: impl Fn(T) -> Value) -> Value
where
    Vec<Option<T>>: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    decode::<Vec<Option<T>>>(row, index, |items| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map(&map).unwrap_or(Value::Null))
                .collect(),
        )
    })
}

/// Renders the raw bytes of a non-NULL column with `render`. Text-format
/// values are returned as they are.
fn decode_raw(
    row: &PgRow,
    index: usize,
    render: impl FnOnce(&[u8]) -> Option<String>,
) -> Option<Value> {
    let raw = row.try_get_raw(index).ok()?;
    if raw.is_null() {
        return Some(Value::Null);
    }
    match raw.format() {
        PgValueFormat::Text => raw.as_str().ok().map(|s| Value::String(s.to_string())),
        PgValueFormat::Binary => render(raw.as_bytes().ok()?).map(Value::String),
    }
}

fn numeric_value(v: BigDecimal) -> Value {
    let text = v.to_string();
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::String(text),
    }
}

fn timestamp_value(v: NaiveDateTime) -> Value {
    Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamptz_value(v: DateTime<Utc>) -> Value {
    Value::String(v.to_rfc3339())
}

fn display_value<T: ToString>(v: T) -> Value {
    Value::String(v.to_string())
}

/// Converts a single column value from a PgRow to our Value type. Returns
/// `None` when the column type has no mapping.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Option<Value> {
    let type_name = type_name.to_uppercase();
    if let Some(element) = type_name.strip_suffix("[]") {
        return convert_array(row, index, element);
    }

    let value = match type_name.as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool>(row, index, Value::Bool),

        "INT2" | "SMALLINT" => decode::<i16>(row, index, |v| Value::Int(v as i64)),

        "INT4" | "INT" | "INTEGER" => decode::<i32>(row, index, |v| Value::Int(v as i64)),

        "INT8" | "BIGINT" => decode::<i64>(row, index, Value::Int),

        "OID" => decode::<Oid>(row, index, |v| Value::Int(v.0 as i64)),

        "FLOAT4" | "REAL" => decode::<f32>(row, index, |v| Value::Float(v as f64)),

        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64>(row, index, Value::Float),

        // Values BigDecimal cannot hold (NaN, +-Infinity) keep their text form.
        "NUMERIC" => match row.try_get::<Option<BigDecimal>, _>(index) {
            Ok(v) => v.map(numeric_value).unwrap_or(Value::Null),
            Err(_) => decode_raw(row, index, numeric_special)?,
        },

        "TIMESTAMP" => decode::<NaiveDateTime>(row, index, timestamp_value),

        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index, timestamptz_value),

        "DATE" => decode::<NaiveDate>(row, index, display_value),

        "TIME" => decode::<NaiveTime>(row, index, display_value),

        "TIMETZ" => decode::<PgTimeTz<NaiveTime, FixedOffset>>(row, index, |v| {
            Value::String(format!("{}{}", v.time, v.offset))
        }),

        "INTERVAL" => decode::<PgInterval>(row, index, |v| Value::String(interval_text(&v))),

        "INET" => decode::<IpNetwork>(row, index, |v| Value::String(network_text(v, false))),

        "CIDR" => decode::<IpNetwork>(row, index, |v| Value::String(network_text(v, true))),

        "UUID" => decode::<Uuid>(row, index, display_value),

        "JSON" | "JSONB" => decode::<JsonValue>(row, index, Value::Json),

        "BYTEA" => decode::<Vec<u8>>(row, index, Value::Bytes),

        "RECORD" => decode_raw(row, index, record_text)?,

        "VOID" => Value::Null,

        // For all other types, try to get as string
        _ => match row.try_get::<Option<String>, _>(index) {
            Ok(v) => v.map(Value::String).unwrap_or(Value::Null),
            Err(_) => decode_raw(row, index, |_| None)?,
        },
    };

    Some(value)
}

fn convert_array(row: &PgRow, index: usize, element: &str) -> Option<Value> {
    let value = match element {
        "BOOL" => decode_array::<bool>(row, index, Value::Bool),
        "INT2" => decode_array::<i16>(row, index, |v| Value::Int(v as i64)),
        "INT4" => decode_array::<i32>(row, index, |v| Value::Int(v as i64)),
        "INT8" => decode_array::<i64>(row, index, Value::Int),
        "FLOAT4" => decode_array::<f32>(row, index, |v| Value::Float(v as f64)),
        "FLOAT8" => decode_array::<f64>(row, index, Value::Float),
        "NUMERIC" => decode_array::<BigDecimal>(row, index, numeric_value),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            decode_array::<String>(row, index, Value::String)
        }
        "DATE" => decode_array::<NaiveDate>(row, index, display_value),
        "TIMESTAMP" => decode_array::<NaiveDateTime>(row, index, timestamp_value),
        "TIMESTAMPTZ" => decode_array::<DateTime<Utc>>(row, index, timestamptz_value),
        "INTERVAL" => decode_array::<PgInterval>(row, index, |v| Value::String(interval_text(&v))),
        "UUID" => decode_array::<Uuid>(row, index, display_value),
        "JSON" | "JSONB" => decode_array::<JsonValue>(row, index, Value::Json),
        _ => return None,
    };
    Some(value)
}

/// Text form of the NUMERIC values BigDecimal rejects, read from the sign
/// word of the binary encoding.
fn numeric_special(bytes: &[u8]) -> Option<String> {
    let sign = u16::from_be_bytes(bytes.get(4..6)?.try_into().ok()?);
    let text = match sign {
        0xC000 => "NaN",
        0xD000 => "Infinity",
        0xF000 => "-Infinity",
        _ => return None,
    };
    Some(text.to_string())
}

/// Formats an interval the way the server does with `IntervalStyle = postgres`,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn interval_text(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    push_unit(&mut parts, interval.months / 12, "year");
    push_unit(&mut parts, interval.months % 12, "mon");
    push_unit(&mut parts, interval.days, "day");

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let frac = micros % 1_000_000;
        if frac != 0 {
            let digits = format!("{frac:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

fn push_unit(parts: &mut Vec<String>, amount: i32, unit: &str) {
    if amount != 0 {
        let plural = if amount == 1 { "" } else { "s" };
        parts.push(format!("{amount} {unit}{plural}"));
    }
}

/// INET host addresses print without a prefix length; CIDR always shows it.
fn network_text(network: IpNetwork, is_cidr: bool) -> String {
    let host_prefix = if network.is_ipv4() { 32 } else { 128 };
    if !is_cidr && network.prefix() == host_prefix {
        network.ip().to_string()
    } else {
        network.to_string()
    }
}

fn take<const N: usize>(buf: &mut &[u8]) -> Option<[u8; N]> {
    let (head, rest) = buf.split_first_chunk::<N>()?;
    *buf = rest;
    Some(*head)
}

/// Renders an anonymous record from its binary encoding in the server's text
/// form, e.g. `(1,a)`. Only fields of built-in scalar types are supported.
fn record_text(bytes: &[u8]) -> Option<String> {
    let mut buf = bytes;
    let count = i32::from_be_bytes(take(&mut buf)?);

    let mut fields = Vec::new();
    for _ in 0..count {
        let oid = u32::from_be_bytes(take(&mut buf)?);
        let len = i32::from_be_bytes(take(&mut buf)?);
        let Ok(len) = usize::try_from(len) else {
            // NULL field
            fields.push(String::new());
            continue;
        };
        let (data, rest) = buf.split_at_checked(len)?;
        buf = rest;
        fields.push(quote_record_field(&record_field_text(oid, data)?));
    }

    Some(format!("({})", fields.join(",")))
}

fn record_field_text(oid: u32, data: &[u8]) -> Option<String> {
    let text = match oid {
        // bool
        16 => (if *data.first()? != 0 { "t" } else { "f" }).to_string(),
        // int8
        20 => i64::from_be_bytes(data.try_into().ok()?).to_string(),
        // int2
        21 => i16::from_be_bytes(data.try_into().ok()?).to_string(),
        // int4
        23 => i32::from_be_bytes(data.try_into().ok()?).to_string(),
        // oid
        26 => u32::from_be_bytes(data.try_into().ok()?).to_string(),
        // float4, float8
        700 => float_text(f32::from_be_bytes(data.try_into().ok()?) as f64),
        701 => float_text(f64::from_be_bytes(data.try_into().ok()?)),
        // name, text, unknown, bpchar, varchar
        19 | 25 | 705 | 1042 | 1043 => std::str::from_utf8(data).ok()?.to_string(),
        _ => return None,
    };
    Some(text)
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else {
        f.to_string()
    }
}

/// Quotes a record field when the server would: empty, or containing
/// whitespace or any of `"\(),`.
fn quote_record_field(field: &str) -> String {
    let needs_quotes = field.is_empty()
        || field
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '(' | ')' | ','));
    if !needs_quotes {
        return field.to_string();
    }

    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> GatewayError {
    let host = config.host();
    let port = config.port();
    let user = config.user();
    let database = config.database();

    error!("Connection to {} failed: {error}", config.display_string());

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        GatewayError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        GatewayError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        GatewayError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        GatewayError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        GatewayError::connection(error.to_string())
    }
}

/// Formats a query error with the server's detail and hint when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\nDETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\nHINT: ");
            result.push_str(hint);
        }
    }

    result
}
