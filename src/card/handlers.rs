//! Card HTTP handlers
//!
//! Routes under `/api/cards` run behind the JWT middleware and receive the
//! caller as `Extension<Principal>`. Routes under `/api/admin/cards`
//! additionally pass the admin gate.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::models::{CardDto, CardStatus, TransactionDto};
use super::service::{CreateCardRequest, UpdateCardRequest};
use super::transfer::{TRANSFER_OK, TransferRequest};
use crate::core_types::{CardId, UserId};
use crate::error::{BankError, BankResult};
use crate::gateway::{
    state::AppState,
    types::{ApiResponse, MessageResponse},
};
use crate::persistence::{CardFilter, Page, PageRequest};
use crate::user_auth::Principal;

/// Filters for the admin card listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminCardQuery {
    /// Owner filter
    #[serde(alias = "userId")]
    pub user_id: Option<UserId>,
    /// ACTIVE, BLOCKED or EXPIRED
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl AdminCardQuery {
    fn filter(&self) -> BankResult<CardFilter> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<CardStatus>)
            .transpose()
            .map_err(BankError::InvalidData)?;
        Ok(CardFilter {
            user_id: self.user_id,
            status,
        })
    }
}

/// Issue a new card
///
/// POST /api/cards
#[utoipa::path(
    post,
    path = "/api/cards",
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created", body = ApiResponse<CardDto>),
        (status = 400, description = "Invalid card data or card already exists"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateCardRequest>,
) -> BankResult<(StatusCode, Json<ApiResponse<CardDto>>)> {
    req.validate()?;
    let card = state.card_service.create_card(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(card.into()))))
}

/// Cards of the caller
///
/// GET /api/cards
#[utoipa::path(
    get,
    path = "/api/cards",
    responses(
        (status = 200, description = "Caller's cards", body = ApiResponse<Vec<CardDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn list_my_cards(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> BankResult<Json<ApiResponse<Vec<CardDto>>>> {
    let cards = state.card_service.get_my_cards(&principal).await?;
    Ok(Json(ApiResponse::success(
        cards.into_iter().map(CardDto::from).collect(),
    )))
}

/// Get card by ID
///
/// GET /api/cards/{id}
#[utoipa::path(
    get,
    path = "/api/cards/{id}",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card details", body = ApiResponse<CardDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<CardDto>>> {
    let card = state.card_service.get_card(&principal, id).await?;
    Ok(Json(ApiResponse::success(card.into())))
}

/// Update card holder name
///
/// PUT /api/cards/{id}
#[utoipa::path(
    put,
    path = "/api/cards/{id}",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    request_body = UpdateCardRequest,
    responses(
        (status = 200, description = "Card updated", body = ApiResponse<CardDto>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CardId>,
    Json(req): Json<UpdateCardRequest>,
) -> BankResult<Json<ApiResponse<CardDto>>> {
    req.validate()?;
    let card = state.card_service.update_card(&principal, id, req).await?;
    Ok(Json(ApiResponse::success(card.into())))
}

/// Delete own card
///
/// DELETE /api/cards/{id}
#[utoipa::path(
    delete,
    path = "/api/cards/{id}",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card deleted", body = ApiResponse<MessageResponse>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<MessageResponse>>> {
    state.card_service.delete_card(&principal, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Card deleted"))))
}

/// Transfer between two of the caller's cards
///
/// POST /api/cards/transaction
#[utoipa::path(
    post,
    path = "/api/cards/transaction",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer completed", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Invalid amount, inactive card or insufficient funds"),
        (status = 403, description = "Card does not belong to caller"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<TransferRequest>,
) -> BankResult<(StatusCode, Json<ApiResponse<MessageResponse>>)> {
    req.validate()?;
    state.card_service.transfer(Some(&principal), &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new(TRANSFER_OK))),
    ))
}

/// Owner requests a block of their card
///
/// POST /api/cards/{id}/block-request
#[utoipa::path(
    post,
    path = "/api/cards/{id}/block-request",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card blocked", body = ApiResponse<CardDto>),
        (status = 400, description = "Card already blocked or expired"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn request_block(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<CardDto>>> {
    let card = state.card_service.request_block_card(&principal, id).await?;
    Ok(Json(ApiResponse::success(card.into())))
}

// ============================================================================
// Admin
// ============================================================================

/// List all cards
///
/// GET /api/admin/cards?userId=&status=&page=&size=
#[utoipa::path(
    get,
    path = "/api/admin/cards",
    params(AdminCardQuery),
    responses(
        (status = 200, description = "Page of cards", body = ApiResponse<Page<CardDto>>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_list_cards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminCardQuery>,
) -> BankResult<Json<ApiResponse<Page<CardDto>>>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.size);
    let cards = state.card_service.get_all_cards(filter, page).await?;
    Ok(Json(ApiResponse::success(cards.map(CardDto::from))))
}

/// Block card
///
/// POST /api/admin/cards/{id}/block
#[utoipa::path(
    post,
    path = "/api/admin/cards/{id}/block",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card blocked", body = ApiResponse<CardDto>),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_block_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<CardDto>>> {
    let card = state.card_service.block_card(id).await?;
    Ok(Json(ApiResponse::success(card.into())))
}

/// Activate card
///
/// POST /api/admin/cards/{id}/activate
#[utoipa::path(
    post,
    path = "/api/admin/cards/{id}/activate",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card activated, or kept EXPIRED past its expiry date", body = ApiResponse<CardDto>),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_activate_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<CardDto>>> {
    let card = state.card_service.activate_card(id).await?;
    Ok(Json(ApiResponse::success(card.into())))
}

/// Delete any card
///
/// DELETE /api/admin/cards/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/cards/{id}",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_delete_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<MessageResponse>>> {
    state.card_service.admin_delete_card(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Card deleted"))))
}

/// Transactions of a card, newest first
///
/// GET /api/admin/cards/{id}/transactions
#[utoipa::path(
    get,
    path = "/api/admin/cards/{id}/transactions",
    params(
        ("id" = i64, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Transactions touching the card", body = ApiResponse<Vec<TransactionDto>>),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_card_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CardId>,
) -> BankResult<Json<ApiResponse<Vec<TransactionDto>>>> {
    let txs = state.card_service.get_card_transactions(id).await?;
    Ok(Json(ApiResponse::success(
        txs.into_iter().map(TransactionDto::from).collect(),
    )))
}
