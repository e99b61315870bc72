use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub database: ServiceHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check endpoint
/// Returns 200 if the database answers, 503 otherwise
pub async fn health_check(State(pool): State<SqlitePool>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&pool).await;

    let healthy = database.status == "healthy";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    };

    tracing::debug!(status = %response.status, "Health check completed");

    (status_code, Json(response))
}

/// Check database connectivity
async fn check_database(pool: &SqlitePool) -> ServiceHealth {
    let start = Instant::now();

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => ServiceHealth {
            status: "healthy".to_string(),
            response_time_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => ServiceHealth {
            status: "unhealthy".to_string(),
            response_time_ms: start.elapsed().as_millis(),
            error: Some(format!("Database error: {}", e)),
        },
    }
}
