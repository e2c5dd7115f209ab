//! Card number hashing and masking
//!
//! The clear card number is never stored. A salted digest is kept for
//! uniqueness checks and the last four digits for display.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Digest used for card hashes. Changing it on a live deployment breaks
/// duplicate detection for every existing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

/// Salted one-way hasher for card numbers
#[derive(Clone)]
pub struct CardHasher {
    salt: String,
    algorithm: HashAlgorithm,
}

impl CardHasher {
    pub fn new(salt: impl Into<String>, algorithm: HashAlgorithm) -> Self {
        Self {
            salt: salt.into(),
            algorithm,
        }
    }

    /// base64(digest(number || salt))
    pub fn hash(&self, card_number: &str) -> String {
        let data = format!("{}{}", card_number, self.salt);
        let digest = match self.algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data.as_bytes()).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data.as_bytes()).to_vec(),
        };
        STANDARD.encode(digest)
    }
}

impl std::fmt::Debug for CardHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // salt stays out of logs
        f.debug_struct("CardHasher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Last four digits of a cleaned card number
pub fn last_four(card_number: &str) -> String {
    let start = card_number.len().saturating_sub(4);
    card_number[start..].to_string()
}

/// Display form shown to clients
pub fn mask(last_four_digits: &str) -> String {
    format!("**** **** **** {}", last_four_digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "7oaOj1g1AfLbcRJlRhXQbAtYF3Slsqjz";

    #[test]
    fn test_hash_deterministic() {
        let hasher = CardHasher::new(SALT, HashAlgorithm::Sha256);
        assert_eq!(hasher.hash("4111111111111111"), hasher.hash("4111111111111111"));
    }

    #[test]
    fn test_hash_distinguishes_numbers_and_salts() {
        let hasher = CardHasher::new(SALT, HashAlgorithm::Sha256);
        assert_ne!(hasher.hash("4111111111111111"), hasher.hash("5555555555554444"));

        let other = CardHasher::new("another-deployment", HashAlgorithm::Sha256);
        assert_ne!(hasher.hash("4111111111111111"), other.hash("4111111111111111"));
    }

    #[test]
    fn test_hash_lengths() {
        // base64 of 32 and 64 bytes
        let sha256 = CardHasher::new(SALT, HashAlgorithm::Sha256);
        let sha512 = CardHasher::new(SALT, HashAlgorithm::Sha512);
        assert_eq!(sha256.hash("4111111111111111").len(), 44);
        assert_eq!(sha512.hash("4111111111111111").len(), 88);
    }

    #[test]
    fn test_known_digest() {
        let hasher = CardHasher::new("", HashAlgorithm::Sha256);
        // sha256("abc")
        assert_eq!(hasher.hash("abc"), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
    }

    #[test]
    fn test_debug_hides_salt() {
        let hasher = CardHasher::new(SALT, HashAlgorithm::Sha256);
        assert!(!format!("{:?}", hasher).contains(SALT));
    }

    #[test]
    fn test_mask() {
        assert_eq!(last_four("4111111111111234"), "1234");
        assert_eq!(mask("1234"), "**** **** **** 1234");
    }
}
