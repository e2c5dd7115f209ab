//! Core types used throughout the system
//!
//! These are the identifier aliases shared by every module. They map 1:1 to
//! `BIGINT` primary keys in PostgreSQL.

/// User ID - primary key of `users`, immutable after assignment.
///
/// # Usage:
/// - Owner reference on every card (`cards.user_id`)
/// - `sub` claim of issued JWTs
pub type UserId = i64;

/// Card ID - primary key of `cards`
pub type CardId = i64;

/// Row ID of a transaction record.
///
/// Distinct from the external `transaction_id` (UUID) handed to clients.
pub type TransactionRowId = i64;
