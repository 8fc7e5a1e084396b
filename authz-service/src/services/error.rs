//! Service error taxonomy.
//!
//! Expected denial paths are typed variants callers must handle; only store
//! faults surface as 500s. The HTTP rendering keeps bodies generic so the
//! response never distinguishes "no such user" from "wrong password", or a
//! locked account from a bad credential.

use authz_core::error::AppError;
use thiserror::Error;

use crate::services::authz::DenyReason;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("session expired or revoked")]
    ExpiredOrRevoked,

    #[error("user is not active")]
    InactiveUser,

    #[error("forbidden: {reason}")]
    Forbidden { reason: DenyReason },

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::InvalidSignature
            | ServiceError::ExpiredOrRevoked
            | ServiceError::InactiveUser => {
                AppError::AuthError(anyhow::anyhow!("Authentication required"))
            }
            ServiceError::Forbidden { .. } => AppError::Forbidden(anyhow::anyhow!("Forbidden")),
            ServiceError::NotFound => AppError::NotFound(anyhow::anyhow!("Not found")),
            ServiceError::RateLimited { retry_after } => AppError::TooManyRequests(
                "Too many attempts. Please try again later.".to_string(),
                retry_after,
            ),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
