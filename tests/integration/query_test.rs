//! Query execution integration tests.
//!
//! Runs queries through the gate and the bounded executor against a real
//! server.

use axum::http::StatusCode;
use serde_json::json;
use sql_gateway::db::DatabaseClient;
use sql_gateway::error::GatewayError;
use sql_gateway::query::QueryExecutor;
use sql_gateway::safety::classify_sql;
use std::time::Duration;

use super::{get_test_client, get_test_database_url, ScratchTable};

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["num", "greeting"]);
    assert_eq!(result.row_count, 1);
    assert!(!result.has_more);
    assert_eq!(result.rows[0]["num"], json!(1));
    assert_eq!(result.rows[0]["greeting"], json!("hello"));
}

#[tokio::test]
async fn test_row_cap_on_large_result() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELECT g AS n FROM generate_series(1, 1500) AS g ORDER BY g")
        .await
        .unwrap();

    assert_eq!(result.row_count, 1000);
    assert!(result.has_more);
    assert_eq!(result.rows[0]["n"], json!(1));
    assert_eq!(result.rows[999]["n"], json!(1000));
}

#[tokio::test]
async fn test_syntax_error_is_execution_error() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let error = QueryExecutor::new(&client)
        .execute("SELECT * FORM nowhere")
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Execution(_)));
}

#[tokio::test]
async fn test_missing_table_is_execution_error() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let error = QueryExecutor::new(&client)
        .execute("SELECT * FROM nonexistent_table_xyz")
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Execution(_)));
    assert!(error.to_string().contains("nonexistent_table_xyz"));
}

#[tokio::test]
async fn test_statement_timeout_is_enforced_by_server() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let error = QueryExecutor::new(&client)
        .with_statement_timeout(Duration::from_millis(200))
        .execute("SELECT pg_sleep(3)")
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Execution(_)));
    assert!(error.to_string().contains("statement timeout"));
}

#[tokio::test]
async fn test_value_conversion() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute(
            "SELECT true AS b, 2.50::numeric AS n, DATE '2024-03-01' AS d, \
             '{\"k\": 1}'::jsonb AS j, '\\x6869'::bytea AS raw, NULL::text AS missing",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row["b"], json!(true));
    assert_eq!(row["n"], json!(2.5));
    assert_eq!(row["d"], json!("2024-03-01"));
    assert_eq!(row["j"], json!({"k": 1}));
    assert_eq!(row["raw"], json!("aGk="));
    assert_eq!(row["missing"], json!(null));
}

#[tokio::test]
async fn test_execution_time_is_measured() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELECT pg_sleep(0.1)")
        .await
        .unwrap();

    assert!(result.execution_time >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_extended_type_conversion() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute(
            "SELECT ARRAY[1, NULL, 3] AS arr, ARRAY['x', 'y'] AS names, \
             interval '1 day 02:00:00' AS iv, '10.0.0.1'::inet AS ip, \
             '10.0.0.0/8'::cidr AS net, 'NaN'::numeric AS nan, \
             '12:00+02'::timetz AS tz, ROW(1, 'a') AS rec",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row["arr"], json!([1, null, 3]));
    assert_eq!(row["names"], json!(["x", "y"]));
    assert_eq!(row["iv"], json!("1 day 02:00:00"));
    assert_eq!(row["ip"], json!("10.0.0.1"));
    assert_eq!(row["net"], json!("10.0.0.0/8"));
    assert_eq!(row["nan"], json!("NaN"));
    assert_eq!(row["tz"], json!("12:00:00+02:00"));
    assert_eq!(row["rec"], json!("(1,a)"));
}

#[tokio::test]
async fn test_aggregated_array_of_names() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute(
            "SELECT array_agg(name ORDER BY name) AS names \
             FROM (VALUES ('Gold'::varchar), ('Einstein')) AS t(name)",
        )
        .await
        .unwrap();

    assert_eq!(result.rows[0]["names"], json!(["Einstein", "Gold"]));
}

#[tokio::test]
async fn test_smuggled_second_statement_is_refused_by_server() {
    let (Some(url), Some(client)) = (get_test_database_url(), get_test_client()) else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = ScratchTable::create(&url, "it_smuggle").await;

    // `--` inside the literal hides the DROP from the keyword scan, so only
    // single-statement preparation keeps it from running.
    let payload = format!("SELECT '--', 1; DROP TABLE {}", table.name);
    assert!(classify_sql(&payload).is_permitted());

    let result = QueryExecutor::new(&client).execute(&payload).await;
    let columns = client.table_columns(&table.name).await.unwrap();

    table.drop_table().await;

    let err = result.unwrap_err();
    assert!(matches!(err, GatewayError::Execution(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(columns.len(), 3, "table must survive");
}
