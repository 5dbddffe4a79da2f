//! Service error handling

use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain_protocol::{ErrorKind, ProtocolError};
use infra_db::DatabaseError;

use crate::auth::AuthError;
use crate::config::ConfigError;

/// Service error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Error body returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub code: String,
    pub message: String,
    /// Whether the same call may succeed later unchanged
    pub retryable: bool,
}

impl ApiError {
    /// Stable code for the error, matching `ErrorKind` for protocol errors
    pub fn code(&self) -> String {
        match self {
            ApiError::Auth(_) => "unauthenticated".to_string(),
            ApiError::Protocol(e) => kind_code(e.kind()),
            ApiError::BadRequest(_) => "bad_request".to_string(),
            ApiError::Config(_) => "configuration".to_string(),
            ApiError::Database(_) => "storage".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Protocol(e) => e.is_retryable(),
            ApiError::Database(e) => e.is_connection_error(),
            _ => false,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

fn kind_code(kind: ErrorKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", kind))
}
