//! Bounded query execution behind the safety gate.
//!
//! A raw query is sanitized and classified first; only permitted queries
//! reach the database, under a statement timeout, and at most `MAX_ROWS`
//! rows are handed back.

use std::time::Duration;

use tracing::{debug, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;
use crate::safety::{classify_sql, Verdict};

/// Maximum rows returned to a caller.
pub const MAX_ROWS: usize = 1000;

/// Engine-enforced limit on a single statement.
pub const STATEMENT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Query executor that gates, runs and caps a query.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
    max_rows: usize,
    statement_timeout: Duration,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor with the default row cap and statement timeout.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self {
            db,
            max_rows: MAX_ROWS,
            statement_timeout: STATEMENT_TIMEOUT,
        }
    }

    /// Overrides the row cap.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Overrides the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Classifies `raw` and, if permitted, executes it.
    ///
    /// Rejected queries fail with a validation error before any connection
    /// is opened. The original text, comments included, is what gets sent
    /// to the database.
    pub async fn execute(&self, raw: &str) -> Result<QueryResult> {
        let verdict = classify_sql(raw);
        if let Verdict::Rejected(reason) = verdict {
            warn!("Rejected query: {reason}");
        }
        verdict.into_result()?;

        self.execute_vetted(raw).await
    }

    /// Executes a query that already passed the gate. Does not re-validate.
    pub async fn execute_vetted(&self, sql: &str) -> Result<QueryResult> {
        let set = self.db.run_query(sql, self.statement_timeout).await?;

        let total_rows = set.rows.len();
        if total_rows > self.max_rows {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, self.max_rows
            );
        }

        let result = QueryResult::from_result_set(set, self.max_rows);
        debug!(
            rows = result.row_count,
            has_more = result.has_more,
            seconds = result.execution_time.as_secs_f64(),
            "Query completed"
        );
        Ok(result)
    }
}
