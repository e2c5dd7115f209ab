//! User authentication: registration, login, JWT issuance and verification

pub mod handlers;
pub mod middleware;
pub mod service;

pub use middleware::{jwt_auth_middleware, require_admin};
pub use service::{Claims, UserAuthService};

use crate::account::models::UserRole;
use crate::core_types::UserId;

/// Verified caller identity, attached to the request by [`jwt_auth_middleware`]
/// and passed explicitly into every service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
