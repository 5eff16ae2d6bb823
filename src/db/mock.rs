//! Mock database client for testing.
//!
//! Provides an in-memory catalog and canned query results so the executor
//! and HTTP layer can be tested without a server.

use super::{ColumnDetail, DatabaseClient, DatabaseInfo, ResultSet, TableSummary};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A table known to the mock catalog.
#[derive(Debug, Clone)]
pub struct MockTable {
    pub name: String,
    pub columns: Vec<ColumnDetail>,
}

impl MockTable {
    /// Creates a table whose columns are `(name, data_type, nullable)` triples.
    pub fn new(name: impl Into<String>, columns: &[(&str, &str, bool)]) -> Self {
        Self {
            name: name.into(),
            columns: columns
                .iter()
                .map(|(column_name, data_type, nullable)| ColumnDetail {
                    column_name: column_name.to_string(),
                    data_type: data_type.to_string(),
                    is_nullable: if *nullable { "YES" } else { "NO" }.to_string(),
                })
                .collect(),
        }
    }
}

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    tables: Vec<MockTable>,
    result: ResultSet,
    query_error: Option<String>,
    unreachable: bool,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock with an empty catalog and an empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the catalog tables.
    pub fn with_tables(mut self, tables: Vec<MockTable>) -> Self {
        self.tables = tables;
        self
    }

    /// Sets the result every query returns.
    pub fn with_result(mut self, result: ResultSet) -> Self {
        self.result = result;
        self
    }

    /// Makes every query fail as if the database rejected it.
    pub fn with_query_error(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    /// Makes every operation fail to connect.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Returns the statements that reached `run_query`, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            Err(GatewayError::connection("Cannot connect to mock database"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn ping(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn list_tables(&self) -> Result<Vec<TableSummary>> {
        self.check_reachable()?;

        let mut tables: Vec<TableSummary> = self
            .tables
            .iter()
            .map(|table| TableSummary {
                table_name: table.name.clone(),
                column_count: table.columns.len() as i64,
            })
            .collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        Ok(tables)
    }

    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnDetail>> {
        self.check_reachable()?;

        Ok(self
            .tables
            .iter()
            .find(|table| table.name == table_name)
            .map(|table| table.columns.clone())
            .unwrap_or_default())
    }

    async fn database_info(&self) -> Result<DatabaseInfo> {
        self.check_reachable()?;

        Ok(DatabaseInfo {
            table_count: self.tables.len() as i64,
            database_size: "8192 bytes".to_string(),
            postgres_version: "PostgreSQL 16.0 (mock)".to_string(),
        })
    }

    async fn run_query(&self, sql: &str, _statement_timeout: Duration) -> Result<ResultSet> {
        self.check_reachable()?;

        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match &self.query_error {
            Some(message) => Err(GatewayError::execution(message.clone())),
            None => Ok(self.result.clone()),
        }
    }
}
