use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use validator::Validate;

use super::service::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::error::BankResult;
use crate::gateway::{state::AppState, types::ApiResponse};

/// Register a new user
///
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> BankResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    req.validate()?;
    let user = state.user_auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Login user
///
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account was blocked"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> BankResult<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;
    let resp = state.user_auth.login(req).await?;
    Ok(Json(ApiResponse::success(resp)))
}
