//! Bank cards server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│  Store   │───▶│ Services │───▶│ Gateway  │
//! │  (YAML)  │    │(PG / mem)│    │(card/usr)│    │ (axum)   │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `bank_cards [--env dev|prod] [--port 8080]`

use std::sync::Arc;

use anyhow::{Context, Result};

use bank_cards::config::{AppConfig, StorageBackend};
use bank_cards::db::Database;
use bank_cards::gateway::{self, state::AppState};
use bank_cards::persistence::{CardStore, MemoryStore, PgStore, UserStore};
use bank_cards::security::CardNumberCipher;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn build_stores(config: &AppConfig) -> Result<(Arc<dyn UserStore>, Arc<dyn CardStore>)> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            let cards: Arc<dyn CardStore> = store;
            Ok((users, cards))
        }
        StorageBackend::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .context("postgres_url is required for postgres storage")?;
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema()
                .await
                .context("Failed to initialize schema")?;
            let store = Arc::new(PgStore::from_database(&db));
            let users: Arc<dyn UserStore> = store.clone();
            let cards: Arc<dyn CardStore> = store;
            Ok((users, cards))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = bank_cards::logging::init_logging(&app_config);

    tracing::info!(
        "Starting bank_cards {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env
    );

    let (users, cards) = build_stores(&app_config).await?;
    let cipher = Arc::new(CardNumberCipher::from_config(&app_config.rsa)?);
    let state = Arc::new(AppState::new(&app_config, users, cards, cipher));

    if let Some(admin) = &app_config.bootstrap_admin {
        state
            .user_auth
            .ensure_admin(admin)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    gateway::run_server(&app_config.gateway, state).await
}
