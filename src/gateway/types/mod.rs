//! Gateway types module
//!
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`MessageResponse`]: Plain confirmation payload
//! - [`error_codes`]: Numeric codes carried by every error response

pub mod response;

pub use response::{ApiResponse, MessageResponse, error_codes};
