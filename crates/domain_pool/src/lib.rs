//! Pool Domain
//!
//! This crate holds the shared capital pool of the insurance protocol and the
//! accounting rules that move funds in and out of it.
//!
//! # Key Concepts
//!
//! - **Insurance Pool**: the record that holds pooled funds and names the
//!   authority allowed to approve claims and administer the pool
//! - **Fund Ledger**: credits and debits against a pool's balance, with the
//!   guarantee that a debit never takes the balance below zero
//! - **Outstanding coverage**: the sum of coverage limits of the pool's
//!   active policies, used to compute free capital
//!
//! # Conservation
//!
//! After every committed operation:
//!
//! ```text
//! balance = contributions + deposits - refunds - claims_paid - withdrawals
//! ```
//!
//! [`FundLedger::reconcile`] checks this identity.

pub mod pool;
pub mod ledger;
pub mod error;

pub use pool::{InsurancePool, PoolTotals};
pub use ledger::{CreditSource, DebitSink, FundLedger};
pub use error::LedgerError;
