//! Shared harness: the full router over an in-memory store

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use bank_cards::config::{AppConfig, BootstrapAdmin};
use bank_cards::gateway::{build_router, state::AppState};
use bank_cards::persistence::{CardStore, MemoryStore};
use bank_cards::security::CardNumberCipher;
use bank_cards::CardId;

const TEST_CONFIG: &str = r#"
log_level: warn
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
jwt:
  secret: "integration-test-secret-0123456789abcdef"
  ttl_hours: 1
card:
  hash_salt: "integration-salt"
rsa:
  allow_ephemeral: true
"#;

pub const ADMIN_PASSWORD: &str = "admin-password-123";
pub const USER_PASSWORD: &str = "password123";

/// One key for the whole test binary, RSA generation is slow in debug builds
pub fn cipher() -> Arc<CardNumberCipher> {
    static CIPHER: OnceLock<Arc<CardNumberCipher>> = OnceLock::new();
    CIPHER
        .get_or_init(|| Arc::new(CardNumberCipher::generate(1024).expect("rsa keygen")))
        .clone()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = AppConfig::from_yaml(TEST_CONFIG).expect("test config");
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(&config, store.clone(), store.clone(), cipher()));
        state
            .user_auth
            .ensure_admin(&BootstrapAdmin {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: ADMIN_PASSWORD.into(),
            })
            .await
            .expect("bootstrap admin");
        Self {
            router: build_router(state),
            store,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn register(&self, username: &str) -> StatusCode {
        let (status, _) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": USER_PASSWORD,
                })),
            )
            .await;
        status
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    /// Register and log in a regular user
    pub async fn user(&self, username: &str) -> String {
        assert_eq!(self.register(username).await, StatusCode::CREATED);
        self.login(username, USER_PASSWORD).await
    }

    pub async fn admin(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    pub async fn create_card(&self, token: &str, number: &str) -> (StatusCode, Value) {
        let encrypted = cipher().encrypt(number).expect("encrypt");
        self.send(
            "POST",
            "/api/cards",
            Some(token),
            Some(json!({
                "encrypted_card_number": encrypted,
                "card_holder": "John Doe",
                "expiry_date": "2099-12-31",
                "cvv": "123",
            })),
        )
        .await
    }

    /// Issue a card and set its balance directly in the store
    pub async fn funded_card(&self, token: &str, number: &str, balance: &str) -> CardId {
        let (status, body) = self.create_card(token, number).await;
        assert_eq!(status, StatusCode::CREATED, "card creation failed: {}", body);
        let id = body["data"]["id"].as_i64().expect("card id");

        self.store
            .set_balance(id, balance.parse::<Decimal>().unwrap())
            .await
            .unwrap()
            .expect("card exists");
        id
    }

    pub async fn balance(&self, id: CardId) -> Decimal {
        self.store.find_card(id).await.unwrap().unwrap().balance
    }

    pub async fn transfer(
        &self,
        token: &str,
        from: CardId,
        to: CardId,
        amount: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/cards/transaction",
            Some(token),
            Some(json!({ "from_card_id": from, "to_card_id": to, "amount": amount })),
        )
        .await
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}
