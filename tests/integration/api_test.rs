//! HTTP integration tests.
//!
//! Drives the router in-process against a real database.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use sql_gateway::api::{router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

use super::get_test_client;

fn app() -> Option<axum::Router> {
    let client = get_test_client()?;
    Some(router(AppState::new(Arc::new(client))))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_query(query: &str) -> Request<Body> {
    Request::post("/execute-query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "query": query }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_is_healthy() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_execute_query_returns_capped_rows() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(
        app,
        post_query("SELECT g AS n FROM generate_series(1, 1200) AS g"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], json!(["n"]));
    assert_eq!(body["rowCount"], json!(1000));
    assert_eq!(body["hasMore"], json!(true));
    assert_eq!(body["rows"].as_array().unwrap().len(), 1000);
    assert!(body["executionTime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_execute_query_empty_result_keeps_columns() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(app, post_query("SELECT 1 AS a, 'x' AS b WHERE false")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], json!(["a", "b"]));
    assert_eq!(body["rows"], json!([]));
    assert_eq!(body["rowCount"], json!(0));
    assert_eq!(body["hasMore"], json!(false));
}

#[tokio::test]
async fn test_execute_query_rejects_writes() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(app, post_query("SELECT 1; DROP TABLE instructor")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        json!("Only SELECT queries are allowed. Data-modifying statements are forbidden.")
    );
}

#[tokio::test]
async fn test_execute_query_reports_database_error() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(app, post_query("SELECT no_such_column FROM pg_class")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Query execution error: "));
}

#[tokio::test]
async fn test_missing_table_columns_is_not_found() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(
        app,
        Request::get("/tables/no_such_table_xyz/columns")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Table no_such_table_xyz does not exist"}));
}

#[tokio::test]
async fn test_database_info_shape() {
    let Some(app) = app() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (status, body) = send(
        app,
        Request::get("/database-info").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["table_count"].is_i64());
    assert!(body["database_size"].is_string());
    assert!(body["postgres_version"].is_string());
}
