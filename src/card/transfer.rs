//! Transfer core
//!
//! [`apply_transfer`] is the read-modify-write step the store runs while
//! both card rows are locked. It is pure apart from drawing a UUID and the
//! creation timestamp, so every rule here is unit tested without storage.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::models::{Card, CardStatus, NewTransaction, TransactionStatus, TransactionType};
use crate::config::TransferPolicy;
use crate::core_types::CardId;
use crate::error::{BankError, BankResult};
use crate::money::{MAX_AMOUNT, format_amount, validate_amount};

pub const TRANSFER_OK: &str = "Transfer successfully";

/// Owner-to-owner transfer between two of the caller's cards
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct TransferRequest {
    #[schema(example = 1)]
    pub from_card_id: CardId,
    #[schema(example = 2)]
    pub to_card_id: CardId,
    #[validate(custom(function = "validate_transfer_amount"))]
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,
}

fn validate_transfer_amount(amount: &Decimal) -> Result<(), ValidationError> {
    validate_amount(*amount).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("amount");
        err.message = Some(e.to_string().into());
        err
    })
}

pub fn transfer_description(from_holder: &str, to_holder: &str, amount: Decimal) -> String {
    format!(
        "Transfer from {} to {}, amount {}",
        from_holder,
        to_holder,
        format_amount(amount)
    )
}

/// Move `amount` from `from` to `to` and describe the movement.
///
/// `amount` must already be validated. Expiry is evaluated against `today`
/// on both cards before any status check; the caller persists the updated
/// statuses together with the balances.
pub fn apply_transfer(
    from: &mut Card,
    to: &mut Card,
    amount: Decimal,
    today: NaiveDate,
    policy: TransferPolicy,
) -> BankResult<NewTransaction> {
    from.apply_expiry(today);
    to.apply_expiry(today);

    if policy.require_active_cards
        && (from.status != CardStatus::Active || to.status != CardStatus::Active)
    {
        return Err(BankError::InvalidData("Card is not active".to_string()));
    }

    let remaining = from.balance - amount;
    if remaining < Decimal::ZERO {
        return Err(BankError::InsufficientFunds("Not enough money".to_string()));
    }

    let credited = to.balance + amount;
    if from.id != to.id && credited > MAX_AMOUNT {
        return Err(BankError::InvalidData(
            "Balance limit exceeded on destination card".to_string(),
        ));
    }

    from.balance = remaining;
    to.balance = credited;

    Ok(NewTransaction {
        transaction_id: Uuid::new_v4(),
        amount,
        description: Some(transfer_description(
            &from.card_holder,
            &to.card_holder,
            amount,
        )),
        status: TransactionStatus::Completed,
        kind: TransactionType::Transfer,
        created_at: Utc::now(),
        from_card_id: Some(from.id),
        to_card_id: to.id,
    })
}
