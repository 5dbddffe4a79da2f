//! Ledger errors

use core_kernel::{AmountError, Lamports};
use thiserror::Error;

/// Errors raised by the fund ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Lamports,
        available: Lamports,
    },

    #[error("Amount arithmetic failed: {0}")]
    Arithmetic(#[from] AmountError),

    #[error("Ledger out of balance: expected {expected}, actual {actual}")]
    Unbalanced {
        expected: Lamports,
        actual: Lamports,
    },

    #[error("Coverage accounting error: {0}")]
    CoverageAccounting(String),
}

impl LedgerError {
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, LedgerError::InsufficientFunds { .. })
    }
}
