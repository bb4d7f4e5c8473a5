//! Centralized API error handling
//!
//! One HTTP-facing error type with status code mapping and a JSON body of the
//! form `{"error": {"code", "message", "details"?}}`. Domain errors convert
//! into it; only store errors expose their internal text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::accounts::AccountError;
use crate::auth::{JwtError, PasswordError, SessionError};
use crate::gate::{GateError, PinOutcome, DEFAULT_MAX_ATTEMPTS};
use crate::ledger::{LedgerError, LedgerFailure};
use crate::store::StoreError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    MissingCredential,

    #[error("Invalid or expired token")]
    InvalidCredential(String),

    #[error("User no longer exists")]
    UnknownSubject,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{message}")]
    WrongSecret { remaining: i32, message: String },

    #[error("{0}")]
    AccountLocked(String),

    #[error("Insufficient balance.")]
    InsufficientFunds,

    #[error("{0}")]
    AccountNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal server error")]
    InternalError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<i32>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingCredential => "MISSING_CREDENTIAL",
            ApiError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            ApiError::UnknownSubject => "UNKNOWN_SUBJECT",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::WrongSecret { .. } => "WRONG_PIN",
            ApiError::AccountLocked(_) => "ACCOUNT_LOCKED",
            ApiError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ApiError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::StoreError(_) => "STORE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential
            | ApiError::InvalidCredential(_)
            | ApiError::UnknownSubject
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::WrongSecret { .. } => StatusCode::BAD_REQUEST,
            ApiError::AccountLocked(_) => StatusCode::LOCKED,
            ApiError::InsufficientFunds => StatusCode::BAD_REQUEST,
            ApiError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::StoreError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::InvalidCredential(reason) => Some(reason.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::InternalError(internal) => {
                tracing::error!(error = %internal, code = %error_code, "Server error occurred");
            }
            ApiError::StoreError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let remaining_attempts = match &self {
            ApiError::WrongSecret { remaining, .. } => Some(*remaining),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: self.details(),
                remaining_attempts,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PinOutcome> for ApiError {
    fn from(outcome: PinOutcome) -> Self {
        let message = outcome.message(DEFAULT_MAX_ATTEMPTS);
        match outcome {
            PinOutcome::WrongSecret { remaining } => ApiError::WrongSecret { remaining, message },
            PinOutcome::Locked { .. } => ApiError::AccountLocked(message),
            PinOutcome::Verified => {
                ApiError::InternalError("verified outcome reported as rejection".to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreError(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MissingCredential => ApiError::MissingCredential,
            SessionError::InvalidCredential(reason) => ApiError::InvalidCredential(reason),
            SessionError::UnknownSubject => ApiError::UnknownSubject,
            SessionError::Forbidden => ApiError::Forbidden,
            SessionError::InvalidCredentials => ApiError::InvalidCredentials,
            SessionError::LoginLocked => {
                ApiError::AccountLocked("Login locked. Contact an administrator.".to_string())
            }
            e @ (SessionError::PasswordMismatch
            | SessionError::PasswordTooShort
            | SessionError::DuplicateUser(_)) => ApiError::BadRequest(e.to_string()),
            SessionError::Store(e) => e.into(),
            SessionError::Password(e) => e.into(),
            SessionError::Token(e) => e.into(),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::AccountNotFound => ApiError::AccountNotFound("Account not found.".to_string()),
            GateError::Rejected(outcome) => outcome.into(),
            GateError::Store(e) => e.into(),
            GateError::Password(e) => e.into(),
            e @ GateError::Contention => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Gate(e) => e.into(),
            e @ (LedgerError::NonPositiveAmount | LedgerError::SameAccount) => {
                ApiError::BadRequest(e.to_string())
            }
            LedgerError::Failed(LedgerFailure::InsufficientFunds) => ApiError::InsufficientFunds,
            LedgerError::Failed(LedgerFailure::Unknown(message)) => ApiError::StoreError(message),
            LedgerError::Failed(failure) => ApiError::AccountNotFound(failure.message()),
            LedgerError::Store(e) => e.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Gate(e) => e.into(),
            e @ (AccountError::PinMismatch | AccountError::OldValueMismatch(_)) => {
                ApiError::BadRequest(e.to_string())
            }
            AccountError::AccountNotFound => {
                ApiError::AccountNotFound("Account not found.".to_string())
            }
            e @ AccountError::NumberExhausted => ApiError::Conflict(e.to_string()),
            AccountError::Store(e) => e.into(),
            AccountError::Password(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
