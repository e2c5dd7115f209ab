//! Error types shared by every service.
//!
//! Services signal failure by returning the specific [`BankError`] kind; the
//! gateway turns it into the unified JSON envelope via [`IntoResponse`].

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::types::error_codes;

/// Domain error taxonomy
#[derive(Error, Debug)]
pub enum BankError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    UserAlreadyExists(String),

    #[error("Amount must be positive with at most 2 fraction digits")]
    InvalidAmount,

    #[error("Account was blocked")]
    AccountDisabled,

    #[error("Invalid username or password")]
    BadCredentials,

    #[error("Request validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BankResult<T> = Result<T, BankError>;

impl BankError {
    pub fn card_not_found() -> Self {
        Self::NotFound("Card not found".to_string())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound("User not found".to_string())
    }

    pub fn access_denied() -> Self {
        Self::AccessDenied("Access denied".to_string())
    }

    /// Stable error name for logs and clients
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::BadCredentials => "BAD_CREDENTIALS",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Numeric code carried in the response envelope
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidData(_) | Self::InvalidAmount | Self::Validation(_) => {
                error_codes::INVALID_PARAMETER
            }
            Self::InsufficientFunds(_) => error_codes::INSUFFICIENT_FUNDS,
            Self::Unauthorized => error_codes::MISSING_AUTH,
            Self::BadCredentials => error_codes::AUTH_FAILED,
            Self::AccessDenied(_) | Self::AccountDisabled => error_codes::ACCESS_DENIED,
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::UserAlreadyExists(_) => error_codes::ALREADY_EXISTS,
            Self::Database(_) | Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied(_) | Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::InvalidData(_)
            | Self::InsufficientFunds(_)
            | Self::InvalidAmount
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::UserAlreadyExists(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to clients. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for BankError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let msg = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), msg)
            })
            .collect();
        Self::Validation(fields)
    }
}

/// JSON body for error responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub error: &'static str,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl IntoResponse for BankError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "Database failure"),
            Self::Internal(e) => tracing::error!(error = %e, "Internal failure"),
            other => tracing::debug!(error = other.name(), "{}", other),
        }

        let status = self.http_status();
        let body = ErrorBody {
            code: self.code(),
            error: self.name(),
            msg: self.public_message(),
            errors: match self {
                Self::Validation(fields) => Some(fields),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
