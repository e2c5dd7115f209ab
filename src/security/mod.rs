//! Transport protection for card numbers
//!
//! Clients fetch the RSA public key, encrypt the card number with
//! RSA-OAEP(SHA-256) and submit it base64 encoded. Only the server's
//! private key can recover the clear number.

pub mod handlers;
pub mod cipher;

pub use cipher::CardNumberCipher;
