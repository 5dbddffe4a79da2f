//! Policy Domain
//!
//! Policies are purchased from a pool, carry a fixed deposit, premium and
//! coverage limit, and leave the active state exactly once.
//!
//! # Lifecycle
//!
//! ```text
//!            ┌──────────► Canceled       (holder cancels, deposit refunded)
//!            │
//!   Active ──┼──────────► ClaimApproved  (authority approves, coverage paid)
//!            │
//!            └──────────► Expired        (term ended)
//! ```
//!
//! Every terminal state is final. Each transition records a [`PolicyEvent`]
//! which the protocol turns into a [`PolicyHistoryEntry`].

pub mod policy;
pub mod events;
pub mod history;
pub mod error;

pub use policy::{InsurancePolicy, PolicyAmounts, PolicyParts, PolicyStatus, UnknownStatus};
pub use events::PolicyEvent;
pub use history::{PolicyAction, PolicyHistoryEntry};
pub use error::PolicyError;
