use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::Principal;
use crate::error::{BankError, BankResult};
use crate::gateway::state::AppState;

fn bearer_token(request: &Request<Body>) -> BankResult<&str> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(BankError::Unauthorized)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(BankError::Unauthorized)
}

/// Verify the bearer token, reload the user and attach a [`Principal`].
///
/// The role is taken from the stored user, so role changes and blocks apply
/// to tokens issued before them.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> BankResult<Response> {
    let claims = state.user_auth.verify_token(bearer_token(&request)?)?;
    let user_id = claims.user_id()?;

    let user = state
        .user_service
        .get_user(user_id)
        .await
        .map_err(|e| match e {
            BankError::NotFound(_) => BankError::Unauthorized,
            other => other,
        })?;
    if !user.enabled {
        return Err(BankError::AccountDisabled);
    }

    request.extensions_mut().insert(Principal {
        user_id: user.id,
        role: user.role,
    });
    Ok(next.run(request).await)
}

/// Must run after [`jwt_auth_middleware`].
pub async fn require_admin(request: Request<Body>, next: Next) -> BankResult<Response> {
    match request.extensions().get::<Principal>() {
        Some(principal) if principal.is_admin() => Ok(next.run(request).await),
        Some(principal) => {
            tracing::warn!(user_id = principal.user_id, "Non-admin access to admin route");
            Err(BankError::access_denied())
        }
        None => Err(BankError::Unauthorized),
    }
}
