/// Application error handling
///
/// Domain errors from the auth core and the collaborators are folded into
/// [`AppError`], which renders the `{success, message, code, errors}` body.
/// Internal error text is logged with an error id and never sent to clients.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{HashError, TokenError};
use crate::revocation::StoreError;
use crate::savings::SavingsError;
use crate::uploads::UploadError;
use crate::users::DirectoryError;

// ============================================================================
// DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
    #[error("{0} must be greater than zero")]
    NotPositive(String),
    #[error("{0} does not match {1}")]
    Mismatch(String, String),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(String),
    #[error("input contains potentially dangerous SQL patterns")]
    PossibleSQLInjection,
}

impl ValidationError {
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::EmptyField(field)
            | ValidationError::TooShort(field, _)
            | ValidationError::TooLong(field, _)
            | ValidationError::InvalidFormat(field)
            | ValidationError::NotPositive(field)
            | ValidationError::Mismatch(field, _)
            | ValidationError::SuspiciousContent(field) => Some(field),
            ValidationError::PossibleSQLInjection => None,
        }
    }
}

/// Authorization failures produced by the bearer-token gate.
///
/// Every variant renders as 401; only the message differs.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Token Expired")]
    TokenExpired,
    #[error("Token Not Valid")]
    TokenNotValid,
}

// ============================================================================
// UNIFIED APPLICATION ERROR TYPE
// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Unknown email and wrong password collapse into this one variant.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Savings(#[from] SavingsError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Token(TokenError::RevocationStore(err))
    }
}

// ============================================================================
// HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: StatusCode) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.as_u16(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: serde_json::Value) -> Self {
        self.errors = Some(errors);
        self
    }
}

impl AppError {
    /// Client-facing message. Never includes internal error text.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::InvalidCredentials => "invalid email or password".to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Token(e) => match e {
                TokenError::Signing(_) => "Failed to generate token".to_string(),
                TokenError::RevocationStore(_) => {
                    "Session service temporarily unavailable".to_string()
                }
                TokenError::Expired => AuthError::TokenExpired.to_string(),
                TokenError::Revoked => AuthError::TokenNotValid.to_string(),
                _ => AuthError::Unauthorized.to_string(),
            },
            AppError::Directory(DirectoryError::Duplicate) => "email already exists".to_string(),
            AppError::Directory(DirectoryError::NotFound) => AuthError::Unauthorized.to_string(),
            AppError::Directory(DirectoryError::Unavailable(_)) => {
                "please try again later".to_string()
            }
            AppError::Savings(SavingsError::UnknownCurrency(code)) => {
                format!("currency {} is not supported", code)
            }
            AppError::Savings(_) => "please try again later".to_string(),
            AppError::Upload(UploadError::TooLarge { max }) => {
                format!("file exceeds maximum size of {} bytes", max)
            }
            AppError::Upload(_) => "Failed to save file".to_string(),
            AppError::Hash(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn errors_detail(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation(e) => Some(match e.field() {
                Some(field) => {
                    let mut errors = serde_json::Map::new();
                    errors.insert(field.to_string(), serde_json::Value::String(e.to_string()));
                    serde_json::Value::Object(errors)
                }
                None => serde_json::Value::String(e.to_string()),
            }),
            _ => None,
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::InvalidCredentials => {
                tracing::warn!(error_id = error_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authorization error");
            }
            AppError::Token(TokenError::Signing(_)) | AppError::Token(TokenError::RevocationStore(_)) => {
                tracing::error!(error_id = error_id, error = %self, "Token service error");
            }
            AppError::Token(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Token rejected");
            }
            AppError::Directory(DirectoryError::Duplicate) => {
                tracing::warn!(error_id = error_id, "Duplicate registration attempt");
            }
            AppError::Savings(SavingsError::UnknownCurrency(code)) => {
                tracing::warn!(error_id = error_id, currency_code = %code, "Unknown currency");
            }
            AppError::Upload(UploadError::TooLarge { .. }) => {
                tracing::warn!(error_id = error_id, error = %self, "Upload rejected");
            }
            _ => {
                tracing::error!(error_id = error_id, error = %self, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Token(e) => match e {
                TokenError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                TokenError::RevocationStore(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::Directory(e) => match e {
                DirectoryError::Duplicate => StatusCode::CONFLICT,
                DirectoryError::NotFound => StatusCode::UNAUTHORIZED,
                DirectoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Savings(SavingsError::UnknownCurrency(_)) => StatusCode::BAD_REQUEST,
            AppError::Savings(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upload(_) | AppError::Hash(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let status = self.status_code();
        let mut body = ErrorResponse::new(self.public_message(), status);
        if let Some(errors) = self.errors_detail() {
            body = body.with_errors(errors);
        }

        HttpResponse::build(status).json(body)
    }
}
