pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::{Context, Result};
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth::{jwt_auth_middleware, require_admin};
use state::AppState;

/// Build the complete router: public, authenticated and admin routes plus
/// the Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes (no auth required)
    // ==========================================================================
    let auth_routes = Router::new()
        .route("/register", post(crate::user_auth::handlers::register))
        .route("/login", post(crate::user_auth::handlers::login));

    // ==========================================================================
    // Card Routes - Protected by JWT
    // ==========================================================================
    let card_routes = {
        use crate::card::handlers as cards;
        Router::new()
            .route("/", post(cards::create_card).get(cards::list_my_cards))
            .route("/transaction", post(cards::transfer))
            .route(
                "/{id}",
                get(cards::get_card)
                    .put(cards::update_card)
                    .delete(cards::delete_card),
            )
            .route("/{id}/block-request", post(cards::request_block))
            .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
    };

    // ==========================================================================
    // Admin Routes - JWT, then ADMIN role
    // ==========================================================================
    let admin_routes = {
        use crate::account::handlers as users;
        use crate::card::handlers as cards;
        Router::new()
            .route("/cards", get(cards::admin_list_cards))
            .route("/cards/{id}", axum::routing::delete(cards::admin_delete_card))
            .route("/cards/{id}/block", post(cards::admin_block_card))
            .route("/cards/{id}/activate", post(cards::admin_activate_card))
            .route("/cards/{id}/transactions", get(cards::admin_card_transactions))
            .route("/users", get(users::list_users))
            .route("/users/{id}", get(users::get_user))
            .route("/users/{id}/role", axum::routing::put(users::change_role))
            .route("/users/{id}/block", post(users::block_user))
            .route("/users/{id}/unblock", post(users::unblock_user))
            .layer(from_fn(require_admin))
            .layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
    };

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route(
            "/api/security/public-key",
            get(crate::security::handlers::public_key),
        )
        .nest("/api/auth", auth_routes)
        .nest("/api/cards", card_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

/// Start HTTP Gateway server and serve until Ctrl-C
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| {
        format!(
            "Failed to bind to {} (port {} may already be in use)",
            addr, config.port
        )
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}
