//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! insurance protocol test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed identities, amounts and timestamps
//! - `builders`: A protocol harness over the in-memory store with a manual clock
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for pools, policies and errors
//! - `generators`: Property-based operation sequences

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
