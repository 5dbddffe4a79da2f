//! Storage ports
//!
//! The protocol talks to storage only through port traits declared in the
//! domain crates. Every port extends [`DomainPort`], and every adapter
//! (in-memory or PostgreSQL) reports failures as a [`PortError`], so the
//! state machine handles storage trouble the same way on either backend.
//!
//! ```text
//!    InsuranceProtocol ──▶ ProtocolStore ──┬──▶ InMemoryProtocolStore
//!                                          └──▶ PostgresProtocolStore
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a storage adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A write collided with an existing record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored record or write broke a storage constraint
    #[error("Rejected by storage: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend aborted the transaction because of lock contention
    #[error("Contention: {0}")]
    Contention(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Storage failure: {0}")]
    Internal(String),
}

impl PortError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        PortError::Rejected(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Unavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal(message.into())
    }

    /// True when the same operation may succeed if retried unchanged
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Unavailable(_) | PortError::Contention(_) | PortError::Timeout(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict(_))
    }
}

/// Marker for port traits; adapters must be shareable across tasks
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Outcome of probing a storage adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    /// Failure detail for an unhealthy adapter
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn healthy(adapter: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter: adapter.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(adapter: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_entity() {
        let error = PortError::not_found("InsurancePool", "123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "InsurancePool 123 not found");
    }

    #[test]
    fn test_transient_errors() {
        assert!(PortError::connection("reset by peer").is_transient());
        assert!(PortError::Contention("could not serialize access".into()).is_transient());
        assert!(PortError::Timeout("a pooled connection".into()).is_transient());

        assert!(!PortError::rejected("negative balance").is_transient());
        assert!(!PortError::conflict("slot taken").is_transient());
        assert!(!PortError::internal("bad row").is_transient());
    }

    #[test]
    fn test_health_results() {
        let ok = HealthCheckResult::healthy("memory", 0);
        assert!(ok.is_healthy());
        assert!(ok.message.is_none());

        let bad = HealthCheckResult::unhealthy("postgres", 12, "connection refused");
        assert_eq!(bad.status, AdapterHealth::Unhealthy);
        assert_eq!(bad.message.as_deref(), Some("connection refused"));
    }
}
