use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::gateway::{state::AppState, types::ApiResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicKeyResponse {
    /// Base64 DER SubjectPublicKeyInfo
    pub public_key: String,
}

/// RSA public key for encrypting card numbers
///
/// GET /api/security/public-key
#[utoipa::path(
    get,
    path = "/api/security/public-key",
    responses(
        (status = 200, description = "Base64 DER encoded public key", body = ApiResponse<PublicKeyResponse>)
    ),
    tag = "Security"
)]
pub async fn public_key(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PublicKeyResponse>> {
    Json(ApiResponse::success(PublicKeyResponse {
        public_key: state.cipher.public_key_base64().to_string(),
    }))
}
