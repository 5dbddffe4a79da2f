//! Kernel errors

use thiserror::Error;

use crate::amount::AmountError;
use crate::temporal::TemporalError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Temporal(#[from] TemporalError),

    /// A setting holds a value the protocol cannot run with
    #[error("Invalid setting `{setting}`: {reason}")]
    Configuration {
        setting: &'static str,
        reason: String,
    },
}

impl CoreError {
    pub fn configuration(setting: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Configuration {
            setting,
            reason: reason.into(),
        }
    }
}
