//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::models::{UserDto, UserRole};
use crate::card::models::{CardDto, CardStatus, TransactionDto, TransactionStatus, TransactionType};
use crate::card::service::{CreateCardRequest, UpdateCardRequest};
use crate::card::transfer::TransferRequest;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::MessageResponse;
use crate::security::handlers::PublicKeyResponse;
use crate::user_auth::service::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

/// JWT bearer authentication security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token from POST /api/auth/login: Authorization: Bearer {access_token}",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Cards API",
        version = "1.0.0",
        description = "Card issuance, owner-scoped transfers between cards and admin oversight.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::security::handlers::public_key,
        crate::card::handlers::create_card,
        crate::card::handlers::list_my_cards,
        crate::card::handlers::get_card,
        crate::card::handlers::update_card,
        crate::card::handlers::delete_card,
        crate::card::handlers::transfer,
        crate::card::handlers::request_block,
        crate::card::handlers::admin_list_cards,
        crate::card::handlers::admin_block_card,
        crate::card::handlers::admin_activate_card,
        crate::card::handlers::admin_delete_card,
        crate::card::handlers::admin_card_transactions,
        crate::account::handlers::list_users,
        crate::account::handlers::get_user,
        crate::account::handlers::change_role,
        crate::account::handlers::block_user,
        crate::account::handlers::unblock_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            PublicKeyResponse,
            CreateCardRequest,
            UpdateCardRequest,
            TransferRequest,
            CardDto,
            CardStatus,
            TransactionDto,
            TransactionStatus,
            TransactionType,
            UserDto,
            UserRole,
            MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Security", description = "Card number transport encryption"),
        (name = "Cards", description = "Card lifecycle and transfers (auth required)"),
        (name = "Admin", description = "Card and user administration (ADMIN role required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
