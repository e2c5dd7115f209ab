use std::sync::Arc;

use super::models::{User, UserRole};
use crate::core_types::UserId;
use crate::error::{BankError, BankResult};
use crate::persistence::{Page, PageRequest, UserStore};

/// Admin-side user management. Users are never deleted, only disabled.
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_all_users(&self, page: PageRequest) -> BankResult<Page<User>> {
        self.users.list_users(page).await
    }

    pub async fn get_user(&self, id: UserId) -> BankResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(BankError::user_not_found)
    }

    pub async fn change_role(&self, id: UserId, role: UserRole) -> BankResult<User> {
        let user = self
            .users
            .set_user_role(id, role)
            .await?
            .ok_or_else(BankError::user_not_found)?;
        tracing::info!(user_id = id, role = %role, "User role changed");
        Ok(user)
    }

    pub async fn block_user(&self, id: UserId) -> BankResult<User> {
        self.set_enabled(id, false).await
    }

    pub async fn unblock_user(&self, id: UserId) -> BankResult<User> {
        self.set_enabled(id, true).await
    }

    async fn set_enabled(&self, id: UserId, enabled: bool) -> BankResult<User> {
        let user = self
            .users
            .set_user_enabled(id, enabled)
            .await?
            .ok_or_else(BankError::user_not_found)?;
        tracing::info!(user_id = id, enabled, "User access changed");
        Ok(user)
    }
}
