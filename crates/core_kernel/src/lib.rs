//! Core Kernel - Foundational types shared by every protocol crate
//!
//! This crate provides the building blocks used across the workspace:
//! - `Lamports`, the checked integer amount type
//! - Coverage terms and the `Clock` abstraction
//! - Strongly-typed identifiers for pools, policies and callers
//! - Port infrastructure for storage adapters

pub mod amount;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use amount::{Lamports, AmountError, LAMPORTS_PER_SOL};
pub use temporal::{Clock, CoverageTerm, ManualClock, SystemClock, TemporalError};
pub use identifiers::{HistoryEntryId, IdParseError, Identity, PolicyId, PoolId};
pub use error::CoreError;
pub use ports::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
