use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::{DirectoryError, StoreError};

/// Caller-facing failures of the interaction and match engine.
///
/// Every failure is scoped to a single request; `Transient` is the only kind
/// that is safe to retry unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    /// Short machine-readable error code used in HTTP responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::InvalidOperation(_) => "invalid_operation",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::ValidationError(_) => "validation_error",
            EngineError::Transient(_) => "transient",
            EngineError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contention(_) | StoreError::Timeout(_) => {
                EngineError::Transient(err.to_string())
            }
            StoreError::Duplicate(_) => EngineError::Conflict(err.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => {
                EngineError::Internal(err.to_string())
            }
        }
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        if err.is_transient() {
            EngineError::Transient(err.to_string())
        } else {
            EngineError::Internal(err.to_string())
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::InvalidOperation(_) | EngineError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let EngineError::Internal(_) = self {
            tracing::error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
