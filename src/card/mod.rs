//! Cards: number validation, hashing, lifecycle and transfers

pub mod handlers;
pub mod hashing;
pub mod models;
pub mod service;
pub mod transfer;
pub mod validator;

pub use models::{Card, CardDto, CardStatus, Transaction, TransactionDto};
pub use service::{CardService, CreateCardRequest, UpdateCardRequest};
pub use transfer::TransferRequest;
