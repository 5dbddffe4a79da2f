//! Policy domain errors
//!
//! This module defines the errors raised by policy lifecycle transitions.

use chrono::{DateTime, Utc};
use thiserror::Error;

use core_kernel::{AmountError, TemporalError};
use crate::policy::PolicyStatus;

/// Errors that can occur in the policy domain
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Deposit, premium or coverage failed validation
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The policy is no longer active
    #[error("Policy is not active (status: {status})")]
    NotActive { status: PolicyStatus },

    /// A claim has already been approved on this policy
    #[error("Claim already approved")]
    ClaimAlreadyApproved,

    /// The coverage term is over
    #[error("Policy expired at {end_time}")]
    Expired { end_time: DateTime<Utc> },

    /// Expiry was requested before the coverage term ended
    #[error("Policy does not expire until {end_time}")]
    NotYetExpired { end_time: DateTime<Utc> },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: PolicyStatus,
        to: PolicyStatus,
    },

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),
}

impl PolicyError {
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        PolicyError::InvalidAmount(message.into())
    }
}
