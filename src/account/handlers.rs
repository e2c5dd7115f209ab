//! Admin user management handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::models::{UserDto, UserRole};
use crate::core_types::UserId;
use crate::error::{BankError, BankResult};
use crate::gateway::{state::AppState, types::ApiResponse};
use crate::persistence::{Page, PageQuery};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleQuery {
    /// USER or ADMIN
    pub role: String,
}

/// List users
///
/// GET /api/admin/users?page=0&size=20
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = ApiResponse<Page<UserDto>>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> BankResult<Json<ApiResponse<Page<UserDto>>>> {
    let users = state.user_service.get_all_users(page.into()).await?;
    Ok(Json(ApiResponse::success(users.map(UserDto::from))))
}

/// Get user by ID
///
/// GET /api/admin/users/{id}
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> BankResult<Json<ApiResponse<UserDto>>> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Change user role
///
/// PUT /api/admin/users/{id}/role?role=ADMIN
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(
        ("id" = i64, Path, description = "User ID"),
        RoleQuery
    ),
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserDto>),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
    Query(query): Query<RoleQuery>,
) -> BankResult<Json<ApiResponse<UserDto>>> {
    let role: UserRole = query.role.parse().map_err(BankError::InvalidData)?;
    let user = state.user_service.change_role(id, role).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Block user
///
/// POST /api/admin/users/{id}/block
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/block",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User blocked", body = ApiResponse<UserDto>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> BankResult<Json<ApiResponse<UserDto>>> {
    let user = state.user_service.block_user(id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Unblock user
///
/// POST /api/admin/users/{id}/unblock
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/unblock",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User unblocked", body = ApiResponse<UserDto>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> BankResult<Json<ApiResponse<UserDto>>> {
    let user = state.user_service.unblock_user(id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}
