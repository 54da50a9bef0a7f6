use super::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NoOp(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Expired(String),

    #[error("Message quota exceeded")]
    QuotaExceeded { used: u32, limit: i64, remaining: u32 },

    #[error("Insufficient recharge balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u32, available: u32 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for AccountError {
    fn from(err: mongodb::error::Error) -> Self {
        AccountError::Persistence(err.to_string())
    }
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict => {
                AccountError::Conflict("Account was modified concurrently, retry".to_string())
            }
            StoreError::Duplicate(field) => {
                AccountError::Conflict(format!("An account with this {} already exists", field))
            }
            StoreError::Database(e) => AccountError::from(e),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => AppError::UnprocessableEntity(anyhow::anyhow!(msg)),
            AccountError::NoOp(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            AccountError::InvalidState(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            AccountError::Expired(msg) => AppError::Gone(anyhow::anyhow!(msg)),
            e @ AccountError::QuotaExceeded { .. } => AppError::TooManyRequests(e.to_string(), None),
            e @ AccountError::InsufficientBalance { .. } => {
                AppError::InternalError(anyhow::anyhow!(e.to_string()))
            }
            AccountError::Persistence(msg) => AppError::DatabaseError(anyhow::anyhow!(msg)),
            AccountError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            AccountError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            AccountError::Internal(e) => AppError::InternalError(e),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            AccountError::QuotaExceeded {
                used,
                limit,
                remaining,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Message quota exceeded",
                    "used": used,
                    "limit": limit,
                    "remaining": remaining,
                    "upgradeRequired": true,
                })),
            )
                .into_response(),
            other => AppError::from(other).into_response(),
        }
    }
}
