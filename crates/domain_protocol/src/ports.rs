//! Protocol Store Port
//!
//! The state machine needs one thing from its substrate: a transaction that
//! reads pool and policy records for update, stages writes, and applies them
//! all at once on commit. Dropping a transaction without committing discards
//! every staged write.
//!
//! Two adapters implement the port:
//!
//! - [`InMemoryProtocolStore`](crate::memory::InMemoryProtocolStore) for
//!   tests and local runs
//! - `PostgresProtocolStore` in `infra_db`, backed by sqlx transactions with
//!   row locks
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! let mut pool = tx.pool_for_update(pool_id).await?.ok_or(...)?;
//! // ... mutate ...
//! tx.update_pool(&pool).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PolicyId, PoolId, PortError};
use domain_policy::{InsurancePolicy, PolicyHistoryEntry};
use domain_pool::InsurancePool;

/// Transactional record substrate
#[async_trait]
pub trait ProtocolStore: DomainPort + HealthCheckable {
    /// Opens a transaction
    ///
    /// While the transaction is open, records it reads for update cannot be
    /// modified by any other transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, PortError>;
}

/// A unit of work against the store
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a pool and locks it for the rest of the transaction
    async fn pool_for_update(&mut self, id: PoolId) -> Result<Option<InsurancePool>, PortError>;

    /// Reads a policy and locks it for the rest of the transaction
    async fn policy_for_update(
        &mut self,
        id: PolicyId,
    ) -> Result<Option<InsurancePolicy>, PortError>;

    /// Stages a new pool
    ///
    /// # Errors
    ///
    /// Returns `PortError::Conflict` if a pool with the same id exists
    async fn insert_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError>;

    /// Stages changes to an existing pool
    async fn update_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError>;

    /// Stages a new policy
    ///
    /// # Errors
    ///
    /// Returns `PortError::Conflict` if a policy with the same id exists
    async fn insert_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError>;

    /// Stages changes to an existing policy
    async fn update_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError>;

    /// Stages a history entry
    async fn append_history(&mut self, entry: &PolicyHistoryEntry) -> Result<(), PortError>;

    /// Reads a policy's history, oldest first
    async fn history(&mut self, policy: PolicyId) -> Result<Vec<PolicyHistoryEntry>, PortError>;

    /// Applies all staged writes atomically
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}
