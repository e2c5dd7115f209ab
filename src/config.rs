use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::card::hashing::HashAlgorithm;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Let sqlx statement logs through at `log_level`. Off keeps sqlx at warn.
    #[serde(default)]
    pub enable_sql_tracing: bool,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageBackend,
    /// PostgreSQL connection URL, required when `storage: postgres`
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub jwt: JwtConfig,
    pub card: CardConfig,
    pub rsa: RsaConfig,
    #[serde(default)]
    pub transfer: TransferPolicy,
    /// Admin account created at startup when no user with that name exists
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, contents are lost on restart
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CardConfig {
    /// Per-deployment salt mixed into every card hash
    pub hash_salt: String,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RsaConfig {
    /// PKCS#8 PEM private key used to decrypt submitted card numbers
    #[serde(default)]
    pub private_key_pem: Option<String>,
    /// Generate a throwaway key pair when no key is configured (dev only)
    #[serde(default)]
    pub allow_ephemeral: bool,
}

/// Transfer rules that go beyond balance sufficiency
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Reject transfers whose source and destination are the same card
    pub reject_same_card: bool,
    /// Only ACTIVE cards may send or receive funds
    pub require_active_cards: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            reject_same_card: true,
            require_active_cards: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config: {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage == StorageBackend::Postgres && self.postgres_url.is_none() {
            bail!("storage is 'postgres' but postgres_url is not set");
        }
        if self.jwt.secret.len() < 32 {
            bail!("jwt.secret must be at least 32 bytes");
        }
        if self.card.hash_salt.trim().is_empty() {
            bail!("card.hash_salt must not be empty");
        }
        if self.rsa.private_key_pem.is_none() && !self.rsa.allow_ephemeral {
            bail!("rsa.private_key_pem is required unless rsa.allow_ephemeral is set");
        }
        if self.jwt.ttl_hours <= 0 {
            bail!("jwt.ttl_hours must be positive");
        }
        Ok(())
    }
}
