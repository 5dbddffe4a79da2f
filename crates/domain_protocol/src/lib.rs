//! Insurance Protocol
//!
//! The protocol state machine that governs pool and policy lifecycle and
//! fund accounting.
//!
//! # Operations
//!
//! | instruction          | signer          | effect                                   |
//! |----------------------|-----------------|------------------------------------------|
//! | `initialize_pool`    | anyone          | creates a pool, signer becomes authority |
//! | `purchase_insurance` | anyone          | creates an active policy, credits deposit|
//! | `cancel_policy`      | policy holder   | cancels, refunds the deposit             |
//! | `approve_claim`      | pool authority  | approves, pays the coverage              |
//! | `contribute_capital` | anyone          | credits the pool                         |
//! | `withdraw_surplus`   | pool authority  | debits free capital                      |
//! | `adjust_coverage`    | policy holder   | changes an active policy's coverage      |
//! | `process_expiration` | anyone          | expires a policy after its term          |
//!
//! Each operation runs in one store transaction and either commits every
//! change or none.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(InMemoryProtocolStore::new());
//! let protocol = InsuranceProtocol::new(store, ProtocolConfig::default());
//!
//! protocol.initialize_pool(authority, pool_id, 0).await?;
//! let receipt = protocol
//!     .purchase_insurance(user, pool_id, None, PolicyAmounts::new(1000, 100, 5000))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod instruction;
pub mod memory;
pub mod ports;
pub mod state_machine;

pub use config::{ProtocolConfig, PurchaseSolvency, RefundPolicy, DEFAULT_COVERAGE_TERM_DAYS};
pub use error::{ErrorKind, ProtocolError, RequiredRole};
pub use instruction::{AccountBindings, Instruction, Receipt, Transfer, TransferKind};
pub use memory::InMemoryProtocolStore;
pub use ports::{ProtocolStore, StoreTransaction};
pub use state_machine::{InsuranceProtocol, PoolAudit};
