//! Card and transaction records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::hashing::mask;
use crate::core_types::{CardId, TransactionRowId, UserId};

// ============================================================================
// Card
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardStatus {
    Active,
    Blocked,
    Expired,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(CardStatus::Active),
            "BLOCKED" => Ok(CardStatus::Blocked),
            "EXPIRED" => Ok(CardStatus::Expired),
            _ => Err(format!("Invalid card status: {}", s)),
        }
    }
}

/// Status a card must carry on `today`.
///
/// A card whose expiry date is strictly before `today` is EXPIRED whatever
/// its stored status says; otherwise the stored status stands.
pub fn expiry_status(status: CardStatus, expiry_date: NaiveDate, today: NaiveDate) -> CardStatus {
    if expiry_date < today {
        CardStatus::Expired
    } else {
        status
    }
}

/// Stored card
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    /// Salted digest of the clear number, unique across all cards
    pub card_hash: String,
    pub last_four_digits: String,
    pub card_holder: String,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    /// Scale 2, never negative
    pub balance: Decimal,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn effective_status(&self, today: NaiveDate) -> CardStatus {
        expiry_status(self.status, self.expiry_date, today)
    }

    /// Bring the stored status in line with the expiry date.
    /// Returns true if the status changed.
    pub fn apply_expiry(&mut self, today: NaiveDate) -> bool {
        let status = self.effective_status(today);
        let changed = status != self.status;
        self.status = status;
        changed
    }

    pub fn masked_number(&self) -> String {
        mask(&self.last_four_digits)
    }
}

/// Card to be inserted; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewCard {
    pub card_hash: String,
    pub last_four_digits: String,
    pub card_holder: String,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    pub user_id: UserId,
}

/// Trim, collapse inner whitespace runs to one space, uppercase.
pub fn normalize_holder(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

// ============================================================================
// Transaction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Completed,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Pending => "PENDING",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            "PENDING" => Ok(TransactionStatus::Pending),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Transfer,
    Payment,
    Refund,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Refund => "REFUND",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER" => Ok(TransactionType::Transfer),
            "PAYMENT" => Ok(TransactionType::Payment),
            "REFUND" => Ok(TransactionType::Refund),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Immutable record of a balance movement
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionRowId,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
    /// None for pure credits, or once the source card is deleted
    pub from_card_id: Option<CardId>,
    pub to_card_id: CardId,
}

/// Transaction to be inserted; the store assigns the row id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
    pub from_card_id: Option<CardId>,
    pub to_card_id: CardId,
}

impl NewTransaction {
    pub fn into_transaction(self, id: TransactionRowId) -> Transaction {
        Transaction {
            id,
            transaction_id: self.transaction_id,
            amount: self.amount,
            description: self.description,
            status: self.status,
            kind: self.kind,
            created_at: self.created_at,
            from_card_id: self.from_card_id,
            to_card_id: self.to_card_id,
        }
    }
}

// ============================================================================
// API DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CardDto {
    #[schema(example = 1)]
    pub id: CardId,
    #[schema(example = "**** **** **** 1234")]
    pub masked_number: String,
    #[schema(example = "JOHN DOE")]
    pub card_holder: String,
    pub expiry_date: NaiveDate,
    #[schema(value_type = String, example = "1000.00")]
    pub balance: Decimal,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Card> for CardDto {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            masked_number: card.masked_number(),
            card_holder: card.card_holder.clone(),
            expiry_date: card.expiry_date,
            balance: card.balance,
            status: card.status,
            created_at: card.created_at,
        }
    }
}

impl From<Card> for CardDto {
    fn from(card: Card) -> Self {
        CardDto::from(&card)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDto {
    pub id: TransactionRowId,
    pub transaction_id: Uuid,
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
    pub from_card_id: Option<CardId>,
    pub to_card_id: CardId,
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            transaction_id: tx.transaction_id,
            amount: tx.amount,
            description: tx.description,
            status: tx.status,
            kind: tx.kind,
            created_at: tx.created_at,
            from_card_id: tx.from_card_id,
            to_card_id: tx.to_card_id,
        }
    }
}
