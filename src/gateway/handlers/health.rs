//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(serde::Serialize, serde::Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Short commit hash the binary was built from
    #[schema(example = "a1b2c3d")]
    pub git_hash: String,
}

/// Health check endpoint
///
/// Pings the storage backend but does NOT expose any internal details in
/// the response.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, version, git_hash}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    match state.storage.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: Utc::now().timestamp_millis(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                git_hash: env!("GIT_HASH").to_string(),
            })),
        ),
        Err(e) => {
            tracing::error!("[HEALTH] storage ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    code: error_codes::SERVICE_UNAVAILABLE,
                    msg: "unavailable".to_string(),
                    data: None,
                }),
            )
        }
    }
}
