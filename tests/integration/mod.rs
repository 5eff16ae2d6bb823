//! Integration tests for the SQL gateway.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

pub mod api_test;
pub mod connection_test;
pub mod query_test;

use sql_gateway::config::ConnectionConfig;
use sql_gateway::db::PostgresClient;
use sqlx::{Connection, Executor, PgConnection};
use std::time::{SystemTime, UNIX_EPOCH};

/// Helper to get test database URL from environment.
pub fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test client.
pub fn get_test_client() -> Option<PostgresClient> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    Some(PostgresClient::new(config))
}

/// A uniquely named table in the public schema, created over a separate
/// connection. Call `drop_table` when done.
pub struct ScratchTable {
    url: String,
    pub name: String,
}

impl ScratchTable {
    pub async fn create(url: &str, prefix: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let name = format!("{prefix}_{}_{nanos}", std::process::id());

        let mut conn = PgConnection::connect(url).await.unwrap();
        conn.execute(
            format!(
                "CREATE TABLE {name} (id INTEGER PRIMARY KEY, label TEXT, created_at TIMESTAMP NOT NULL)"
            )
            .as_str(),
        )
        .await
        .unwrap();
        conn.close().await.unwrap();

        Self {
            url: url.to_string(),
            name,
        }
    }

    pub async fn drop_table(self) {
        let mut conn = PgConnection::connect(&self.url).await.unwrap();
        conn.execute(format!("DROP TABLE IF EXISTS {}", self.name).as_str())
            .await
            .unwrap();
        conn.close().await.unwrap();
    }
}
