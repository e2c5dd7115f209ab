//! Money amounts
//!
//! Balances and transfer amounts are `rust_decimal::Decimal` values with two
//! fraction digits, matching `NUMERIC(15, 2)` in storage. All client-provided
//! amounts go through [`validate_amount`] before they touch a balance.
//!
//! ## Usage
//! ```rust
//! use bank_cards::money::{parse_amount, format_amount};
//!
//! let amount = parse_amount("100.5").unwrap();
//! assert_eq!(format_amount(amount), "100.50");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

use crate::error::BankError;

/// Fraction digits carried by every balance and amount
pub const BALANCE_SCALE: u32 = 2;

/// Largest value `NUMERIC(15, 2)` can hold: 13 integer digits
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    NotPositive,

    #[error("Amount too large")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<MoneyError> for BankError {
    fn from(err: MoneyError) -> Self {
        tracing::debug!(error = %err, "Rejected amount");
        BankError::InvalidAmount
    }
}

/// Check a transfer amount and bring it to scale 2.
///
/// Trailing zeros do not count against precision: `1.500` is accepted as
/// `1.50`, `1.505` is rejected.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(MoneyError::NotPositive);
    }

    let normalized = amount.normalize();
    if normalized.scale() > BALANCE_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: BALANCE_SCALE,
        });
    }

    if normalized > MAX_AMOUNT {
        return Err(MoneyError::Overflow);
    }

    Ok(to_scale(normalized))
}

/// Parse a client string such as `"100"` or `"99.95"`.
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    let decimal = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(format!("{}: {}", amount_str, e)))?;
    validate_amount(decimal)
}

/// Rescale to exactly two fraction digits without changing the value.
pub fn to_scale(value: Decimal) -> Decimal {
    let mut v = value;
    v.rescale(BALANCE_SCALE);
    v
}

/// Render with exactly two fraction digits.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_accepts_two_decimals() {
        assert_eq!(validate_amount(d("100")).unwrap(), d("100.00"));
        assert_eq!(validate_amount(d("0.01")).unwrap(), d("0.01"));
        assert_eq!(validate_amount(d("1.500")).unwrap().to_string(), "1.50");
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert_eq!(validate_amount(d("0")), Err(MoneyError::NotPositive));
        assert_eq!(validate_amount(d("0.00")), Err(MoneyError::NotPositive));
        assert_eq!(validate_amount(d("-5")), Err(MoneyError::NotPositive));
    }

    #[test]
    fn test_validate_rejects_extra_precision() {
        assert_eq!(
            validate_amount(d("1.505")),
            Err(MoneyError::PrecisionOverflow { provided: 3, max: 2 })
        );
        assert!(validate_amount(d("0.001")).is_err());
    }

    #[test]
    fn test_max_amount() {
        assert_eq!(MAX_AMOUNT, d("9999999999999.99"));
        assert!(validate_amount(MAX_AMOUNT).is_ok());
        assert_eq!(validate_amount(d("10000000000000")), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 99.95 ").unwrap(), d("99.95"));
        assert!(matches!(parse_amount(""), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("abc"), Err(MoneyError::InvalidFormat(_))));
        assert_eq!(parse_amount("-1"), Err(MoneyError::NotPositive));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(d("900")), "900.00");
        assert_eq!(format_amount(d("0.5")), "0.50");
    }

    #[test]
    fn test_into_bank_error() {
        let err: BankError = MoneyError::NotPositive.into();
        assert!(matches!(err, BankError::InvalidAmount));
    }
}
