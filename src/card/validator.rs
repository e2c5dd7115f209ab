//! Card number structure checks

use std::fmt;

/// Shortest and longest PAN lengths accepted (ISO/IEC 7812)
pub const MIN_DIGITS: usize = 13;
pub const MAX_DIGITS: usize = 19;

/// Luhn checksum over the digits of `number`.
///
/// Non-digit characters (spaces, dashes) are ignored. Returns `false` for
/// blank input or when the digit count is outside `MIN_DIGITS..=MAX_DIGITS`.
pub fn luhn_check(number: &str) -> bool {
    if number.trim().is_empty() {
        return false;
    }

    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Card network guessed from the leading digits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardBrand {
    pub fn detect(number: &str) -> Self {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.starts_with('4') {
            CardBrand::Visa
        } else if digits.starts_with('5') {
            CardBrand::Mastercard
        } else if digits.starts_with("34") || digits.starts_with("37") {
            CardBrand::Amex
        } else if digits.starts_with('6') {
            CardBrand::Discover
        } else {
            CardBrand::Unknown
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardBrand::Visa => write!(f, "VISA"),
            CardBrand::Mastercard => write!(f, "MASTERCARD"),
            CardBrand::Amex => write!(f, "AMEX"),
            CardBrand::Discover => write!(f, "DISCOVER"),
            CardBrand::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
