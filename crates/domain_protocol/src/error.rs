//! Protocol errors
//!
//! Every failed operation returns exactly one of these and leaves all pool
//! and policy records unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{Identity, Lamports, PolicyId, PoolId, PortError};
use domain_policy::{PolicyError, PolicyStatus};
use domain_pool::LedgerError;

/// Role a caller must hold for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    PolicyHolder,
    PoolAuthority,
}

impl std::fmt::Display for RequiredRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredRole::PolicyHolder => f.write_str("policy holder"),
            RequiredRole::PoolAuthority => f.write_str("pool authority"),
        }
    }
}

/// Errors returned by protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Account already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unauthorized: {caller} is not the {required}")]
    Unauthorized {
        caller: Identity,
        required: RequiredRole,
    },

    #[error("Policy is not active (status: {status})")]
    PolicyNotActive { status: PolicyStatus },

    #[error("Claim already approved")]
    ClaimAlreadyApproved,

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Lamports,
        available: Lamports,
    },

    #[error("Policy expired at {end_time}")]
    PolicyExpired { end_time: DateTime<Utc> },

    #[error("Policy does not expire until {end_time}")]
    PolicyNotExpired { end_time: DateTime<Utc> },

    #[error("Policy {policy} belongs to pool {actual}, not {expected}")]
    PoolMismatch {
        policy: PolicyId,
        expected: PoolId,
        actual: PoolId,
    },

    #[error("Accounting error: {0}")]
    Accounting(String),

    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

/// Stable error codes for clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AlreadyInitialized,
    PoolNotFound,
    PolicyNotFound,
    InvalidAmount,
    Unauthorized,
    PolicyNotActive,
    ClaimAlreadyApproved,
    InsufficientFunds,
    PolicyExpired,
    PolicyNotExpired,
    PoolMismatch,
    Accounting,
    Storage,
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            ProtocolError::PoolNotFound(_) => ErrorKind::PoolNotFound,
            ProtocolError::PolicyNotFound(_) => ErrorKind::PolicyNotFound,
            ProtocolError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            ProtocolError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ProtocolError::PolicyNotActive { .. } => ErrorKind::PolicyNotActive,
            ProtocolError::ClaimAlreadyApproved => ErrorKind::ClaimAlreadyApproved,
            ProtocolError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            ProtocolError::PolicyExpired { .. } => ErrorKind::PolicyExpired,
            ProtocolError::PolicyNotExpired { .. } => ErrorKind::PolicyNotExpired,
            ProtocolError::PoolMismatch { .. } => ErrorKind::PoolMismatch,
            ProtocolError::Accounting(_) => ErrorKind::Accounting,
            ProtocolError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns true if the same call may succeed later without changes
    ///
    /// An unpaid claim becomes payable once the pool is funded, and transient
    /// storage failures clear on their own. The protocol never retries itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProtocolError::InsufficientFunds { .. } => true,
            ProtocolError::Storage(e) => e.is_transient(),
            _ => false,
        }
    }

    pub(crate) fn unauthorized(caller: Identity, required: RequiredRole) -> Self {
        ProtocolError::Unauthorized { caller, required }
    }
}

impl From<PolicyError> for ProtocolError {
    fn from(error: PolicyError) -> Self {
        match error {
            PolicyError::InvalidAmount(message) => ProtocolError::InvalidAmount(message),
            PolicyError::NotActive { status } => ProtocolError::PolicyNotActive { status },
            PolicyError::ClaimAlreadyApproved => ProtocolError::ClaimAlreadyApproved,
            PolicyError::Expired { end_time } => ProtocolError::PolicyExpired { end_time },
            PolicyError::NotYetExpired { end_time } => ProtocolError::PolicyNotExpired { end_time },
            PolicyError::InvalidStateTransition { from, .. } => {
                ProtocolError::PolicyNotActive { status: from }
            }
            other @ (PolicyError::Amount(_) | PolicyError::Temporal(_)) => {
                ProtocolError::Accounting(other.to_string())
            }
        }
    }
}

impl From<LedgerError> for ProtocolError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::InsufficientFunds { requested, available } => {
                ProtocolError::InsufficientFunds { requested, available }
            }
            other => ProtocolError::Accounting(other.to_string()),
        }
    }
}
