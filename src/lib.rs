//! Bank card management backend
//!
//! Users register and log in, issue cards whose numbers arrive RSA encrypted,
//! and move money between their own cards. Administrators oversee cards and
//! users.
//!
//! # Modules
//!
//! - [`core_types`] - Id aliases shared by every layer
//! - [`money`] - Amount validation at two fraction digits
//! - [`card`] - Luhn validation, card hashing, lifecycle and transfers
//! - [`account`] - User model and admin user management
//! - [`user_auth`] - Registration, login, JWT middleware
//! - [`security`] - RSA decryption of submitted card numbers
//! - [`persistence`] - Storage ports with PostgreSQL and in-memory adapters
//! - [`gateway`] - HTTP router, OpenAPI docs, health check

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod error;
pub mod logging;
pub mod money;

pub mod account;
pub mod card;
pub mod db;
pub mod gateway;
pub mod persistence;
pub mod security;
pub mod user_auth;

// Convenient re-exports at crate root
pub use core_types::{CardId, TransactionRowId, UserId};
pub use error::{BankError, BankResult};
