use std::sync::Arc;

use crate::account::UserService;
use crate::card::CardService;
use crate::card::hashing::CardHasher;
use crate::config::AppConfig;
use crate::persistence::{CardStore, UserStore};
use crate::security::CardNumberCipher;
use crate::user_auth::UserAuthService;

/// Gateway application state (shared by every handler)
#[derive(Clone)]
pub struct AppState {
    pub card_service: Arc<CardService>,
    pub user_service: Arc<UserService>,
    pub user_auth: Arc<UserAuthService>,
    pub cipher: Arc<CardNumberCipher>,
    /// Storage handle pinged by the health check
    pub storage: Arc<dyn CardStore>,
}

impl AppState {
    /// Wire all services over one pair of stores
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        cards: Arc<dyn CardStore>,
        cipher: Arc<CardNumberCipher>,
    ) -> Self {
        let hasher = CardHasher::new(config.card.hash_salt.clone(), config.card.hash_algorithm);
        Self {
            card_service: Arc::new(CardService::new(
                cards.clone(),
                users.clone(),
                hasher,
                cipher.clone(),
                config.transfer,
            )),
            user_service: Arc::new(UserService::new(users.clone())),
            user_auth: Arc::new(UserAuthService::new(users, &config.jwt)),
            cipher,
            storage: cards,
        }
    }
}
