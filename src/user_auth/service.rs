use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::account::models::{NewUser, UserDto, UserRole};
use crate::config::{BootstrapAdmin, JwtConfig};
use crate::core_types::UserId;
use crate::error::{BankError, BankResult};
use crate::persistence::UserStore;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: usize,
    pub iat: usize,
    pub role: UserRole,
}

impl Claims {
    pub fn user_id(&self) -> BankResult<UserId> {
        self.sub.parse().map_err(|_| BankError::Unauthorized)
    }
}

/// User Registration Request
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 20, message = "Username must be between 3 and 20 characters"))]
    #[schema(example = "john")]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "john@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "john")]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub user: UserDto,
}

pub struct UserAuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    ttl_hours: i64,
}

impl UserAuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: &JwtConfig) -> Self {
        Self {
            users,
            jwt_secret: jwt.secret.clone(),
            ttl_hours: jwt.ttl_hours,
        }
    }

    fn hash_password(password: &str) -> BankResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| BankError::Internal(format!("Hashing failed: {}", e)))
    }

    /// Register a new user with role USER
    pub async fn register(&self, req: RegisterRequest) -> BankResult<RegisterResponse> {
        if self.users.user_exists(&req.username, &req.email).await? {
            tracing::warn!(
                username = %req.username,
                email = %req.email,
                "Registration attempt with existing username or email"
            );
            return Err(BankError::UserAlreadyExists(
                "Username or Email already exists".to_string(),
            ));
        }

        let user = self
            .users
            .create_user(NewUser {
                username: req.username,
                email: req.email,
                password_hash: Self::hash_password(&req.password)?,
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        })
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> BankResult<LoginResponse> {
        let user = self
            .users
            .find_user_by_username(&req.username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %req.username, "Login attempt for unknown user");
                BankError::user_not_found()
            })?;

        if !user.enabled {
            tracing::warn!(user_id = user.id, "Login attempt for disabled user");
            return Err(BankError::AccountDisabled);
        }

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| BankError::Internal(format!("Invalid hash format: {}", e)))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                tracing::warn!(user_id = user.id, "Failed login attempt: invalid password");
                BankError::BadCredentials
            })?;

        let access_token = self.issue_token(user.id, user.role)?;
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            user: UserDto::from(&user),
        })
    }

    pub fn issue_token(&self, user_id: UserId, role: UserRole) -> BankResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp() as usize,
            iat: now.timestamp() as usize,
            role,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| BankError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> BankResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                BankError::Unauthorized
            })
    }

    /// Create the configured admin account unless the username is taken.
    pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> BankResult<()> {
        if let Some(existing) = self.users.find_user_by_username(&admin.username).await? {
            if !existing.is_admin() {
                tracing::warn!(
                    username = %admin.username,
                    "Bootstrap admin name belongs to a non-admin user, leaving it unchanged"
                );
            }
            return Ok(());
        }

        let user = self
            .users
            .create_user(NewUser {
                username: admin.username.clone(),
                email: admin.email.clone(),
                password_hash: Self::hash_password(&admin.password)?,
                role: UserRole::Admin,
            })
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn service() -> (UserAuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let jwt = JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".into(),
            ttl_hours: 1,
        };
        (UserAuthService::new(store.clone(), &jwt), store)
    }

    fn register_req(name: &str) -> RegisterRequest {
        RegisterRequest {
            username: name.into(),
            email: format!("{}@example.com", name),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, _) = service();
        let registered = auth.register(register_req("john")).await.unwrap();
        assert_eq!(registered.username, "john");

        let login = auth
            .login(LoginRequest {
                username: "john".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.user.id, registered.id);

        let claims = auth.verify_token(&login.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), registered.id);
        assert_eq!(claims.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (auth, _) = service();
        auth.register(register_req("john")).await.unwrap();
        let err = auth.register(register_req("john")).await.unwrap_err();
        assert!(matches!(err, BankError::UserAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (auth, store) = service();
        let user = auth.register(register_req("john")).await.unwrap();

        let err = auth
            .login(LoginRequest {
                username: "nobody".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::NotFound(_)));

        let err = auth
            .login(LoginRequest {
                username: "john".into(),
                password: "wrong-password".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::BadCredentials));

        store.set_user_enabled(user.id, false).await.unwrap();
        let err = auth
            .login(LoginRequest {
                username: "john".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::AccountDisabled));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let (auth, _) = service();
        let token = auth.issue_token(1, UserRole::Admin).unwrap();
        assert!(auth.verify_token(&format!("{}x", token)).is_err());
        assert!(auth.verify_token("garbage").is_err());
    }

    #[test]
    fn test_register_validation() {
        let mut req = register_req("jo");
        assert!(req.validate().is_err());
        req.username = "john".into();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());
        req.email = "john@example.com".into();
        req.password = "short".into();
        assert!(req.validate().is_err());
        req.password = "long enough".into();
        assert!(req.validate().is_ok());
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (auth, store) = service();
        let admin = BootstrapAdmin {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "admin-password-123".into(),
        };
        auth.ensure_admin(&admin).await.unwrap();
        auth.ensure_admin(&admin).await.unwrap();

        let user = store.find_user_by_username("admin").await.unwrap().unwrap();
        assert!(user.is_admin());
        assert_eq!(
            store
                .list_users(crate::persistence::PageRequest::default())
                .await
                .unwrap()
                .total_elements,
            1
        );
    }
}
