// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use crate::storage::StoreError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use identity_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Message shared by every credential mismatch, whatever the cause
pub const CREDENTIALS_MISMATCH: &str = "username or password does not match";

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("username or password does not match")]
    InvalidCredentials,

    #[error("account locked")]
    AccountLocked,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: missing claim '{0}'")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("username or email already registered")]
    AlreadyExists,

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::AccountLocked | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            },
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyExists => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::AccountLocked => "AUTH_002",
            AppError::Unauthorized => "AUTH_003",
            AppError::Forbidden(_) => "AUTH_004",
            AppError::NotFound => "NF_001",
            AppError::AlreadyExists => "CONF_001",
            AppError::Store(_) => "STORE_001",
            AppError::Hashing(_) => "HASH_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to hand to the caller.
    ///
    /// Validation reasons are surfaced as-is; server faults never leak their detail.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Validation(reason) => reason.clone(),
            AppError::InvalidCredentials => CREDENTIALS_MISMATCH.to_string(),
            AppError::AccountLocked => "account locked".to_string(),
            AppError::Unauthorized => "unauthorized".to_string(),
            AppError::Forbidden(_) => "forbidden".to_string(),
            AppError::NotFound => "resource not found".to_string(),
            AppError::AlreadyExists => "username or email already registered".to_string(),
            AppError::Store(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                "internal server error".to_string()
            },
        }
    }

    /// Whether this is a server-side fault rather than a caller error
    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_fault() {
            tracing::error!(code, error = %self, "request failed with server fault");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.sanitized_message(),
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Duplicate(_) => AppError::AlreadyExists,
            StoreError::LastClaim => AppError::Validation(err.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}
