//! Endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ApiError;
use super::examples::{ExampleQuery, EXAMPLE_QUERIES};
use super::AppState;
use crate::db::{ColumnDetail, DatabaseInfo, QueryResult, TableSummary};
use crate::error::GatewayError;
use crate::query::QueryExecutor;

/// Body of `POST /execute-query`.
#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn list_tables(State(state): State<AppState>) -> Result<Json<Vec<TableSummary>>, ApiError> {
    Ok(Json(state.db.list_tables().await?))
}

pub async fn table_columns(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> Result<Json<Vec<ColumnDetail>>, ApiError> {
    let columns = state.db.table_columns(&table_name).await?;
    if columns.is_empty() {
        return Err(GatewayError::not_found(format!("Table {table_name} does not exist")).into());
    }
    Ok(Json(columns))
}

pub async fn execute_query(
    State(state): State<AppState>,
    Json(request): Json<ExecuteQueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let result = QueryExecutor::new(state.db.as_ref())
        .execute(&request.query)
        .await?;
    Ok(Json(result))
}

pub async fn database_info(State(state): State<AppState>) -> Result<Json<DatabaseInfo>, ApiError> {
    Ok(Json(state.db.database_info().await?))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    state.db.ping().await.map_err(|e| {
        warn!("Health check failed: {e}");
        ApiError::service_unavailable("Database connection failed")
    })?;
    Ok(Json(HealthStatus { status: "healthy" }))
}

pub async fn example_queries() -> Json<&'static [ExampleQuery]> {
    Json(EXAMPLE_QUERIES)
}
