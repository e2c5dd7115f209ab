//! Data models for user accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::core_types::UserId;

/// Access role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // tolerate the "ROLE_" prefix older tokens and rows may carry
        match s.trim_start_matches("ROLE_").to_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub enabled: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User to be inserted; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Public view of a user, never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "john")]
    pub username: String,
    #[schema(example = "john@example.com")]
    pub email: String,
    pub enabled: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            enabled: user.enabled,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("USER".parse::<UserRole>().unwrap(), UserRole::User);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("ROLE_ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("ROOT".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_dto_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 7,
            username: "john".to_string(),
            email: "john@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            enabled: true,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&UserDto::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"USER\""));
        assert!(!user.is_admin());
    }
}
