//! Database abstraction layer for the SQL gateway.
//!
//! Provides a trait-based interface for the handful of database operations
//! the HTTP layer needs, so the endpoints can be exercised against an
//! in-memory mock as well as a real PostgreSQL server.

mod mock;
mod postgres;
mod types;

pub use mock::{MockDatabaseClient, MockTable};
pub use postgres::PostgresClient;
pub use types::{
    ColumnDetail, DatabaseInfo, QueryResult, ResultSet, Row, TableSummary, Value,
};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Trait defining the interface for database clients.
///
/// Implementations acquire a connection per call and release it before
/// returning, on success and failure alike.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Opens and immediately closes a connection.
    async fn ping(&self) -> Result<()>;

    /// Lists base tables in the public schema, sorted by name.
    async fn list_tables(&self) -> Result<Vec<TableSummary>>;

    /// Lists a table's columns in physical order. Empty if the table does not exist.
    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnDetail>>;

    /// Returns table count, human-readable size and server version.
    async fn database_info(&self) -> Result<DatabaseInfo>;

    /// Executes an already-vetted statement under an engine-enforced timeout
    /// and returns every row it produced.
    async fn run_query(&self, sql: &str, statement_timeout: Duration) -> Result<ResultSet>;
}
