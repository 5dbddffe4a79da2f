//! In-memory protocol store
//!
//! A transaction holds an owned lock on the whole state for its lifetime,
//! so transactions are fully serialized. Writes are staged in a per
//! transaction overlay holding only the rows it touched, and are folded into
//! the shared state on commit.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PolicyId, PoolId, PortError,
};
use domain_policy::{InsurancePolicy, PolicyHistoryEntry};
use domain_pool::InsurancePool;

use crate::ports::{ProtocolStore, StoreTransaction};

#[derive(Debug, Default)]
struct MemoryState {
    pools: HashMap<PoolId, InsurancePool>,
    policies: HashMap<PolicyId, InsurancePolicy>,
    /// History per policy, oldest first
    history: HashMap<PolicyId, Vec<PolicyHistoryEntry>>,
}

/// In-memory implementation of [`ProtocolStore`]
#[derive(Debug, Default, Clone)]
pub struct InMemoryProtocolStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryProtocolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following commit fail with a connection error
    ///
    /// Used to check that a failed commit leaves no trace.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Committed pool record
    pub async fn pool(&self, id: PoolId) -> Option<InsurancePool> {
        self.state.lock().await.pools.get(&id).cloned()
    }

    /// Committed policy record
    pub async fn policy(&self, id: PolicyId) -> Option<InsurancePolicy> {
        self.state.lock().await.policies.get(&id).cloned()
    }

    /// All committed policies of a pool
    pub async fn policies_in(&self, pool: PoolId) -> Vec<InsurancePolicy> {
        let state = self.state.lock().await;
        let mut policies: Vec<InsurancePolicy> = state
            .policies
            .values()
            .filter(|p| p.pool() == pool)
            .cloned()
            .collect();
        policies.sort_by_key(|p| p.id());
        policies
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.values().map(Vec::len).sum()
    }
}

impl DomainPort for InMemoryProtocolStore {}

#[async_trait]
impl HealthCheckable for InMemoryProtocolStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-protocol-store", 0)
    }
}

#[async_trait]
impl ProtocolStore for InMemoryProtocolStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, PortError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            guard,
            pools: HashMap::new(),
            policies: HashMap::new(),
            appended: Vec::new(),
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    pools: HashMap<PoolId, InsurancePool>,
    policies: HashMap<PolicyId, InsurancePolicy>,
    appended: Vec<PolicyHistoryEntry>,
    fail_commit: bool,
}

impl InMemoryTransaction {
    fn has_pool(&self, id: &PoolId) -> bool {
        self.pools.contains_key(id) || self.guard.pools.contains_key(id)
    }

    fn has_policy(&self, id: &PolicyId) -> bool {
        self.policies.contains_key(id) || self.guard.policies.contains_key(id)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn pool_for_update(&mut self, id: PoolId) -> Result<Option<InsurancePool>, PortError> {
        Ok(self
            .pools
            .get(&id)
            .or_else(|| self.guard.pools.get(&id))
            .cloned())
    }

    async fn policy_for_update(
        &mut self,
        id: PolicyId,
    ) -> Result<Option<InsurancePolicy>, PortError> {
        Ok(self
            .policies
            .get(&id)
            .or_else(|| self.guard.policies.get(&id))
            .cloned())
    }

    async fn insert_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError> {
        if self.has_pool(&pool.id) {
            return Err(PortError::conflict(format!("pool {} already exists", pool.id)));
        }
        self.pools.insert(pool.id, pool.clone());
        Ok(())
    }

    async fn update_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError> {
        if !self.has_pool(&pool.id) {
            return Err(PortError::not_found("InsurancePool", pool.id));
        }
        self.pools.insert(pool.id, pool.clone());
        Ok(())
    }

    async fn insert_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError> {
        if self.has_policy(&policy.id()) {
            return Err(PortError::conflict(format!("policy {} already exists", policy.id())));
        }
        self.policies.insert(policy.id(), policy.clone());
        Ok(())
    }

    async fn update_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError> {
        if !self.has_policy(&policy.id()) {
            return Err(PortError::not_found("InsurancePolicy", policy.id()));
        }
        self.policies.insert(policy.id(), policy.clone());
        Ok(())
    }

    async fn append_history(&mut self, entry: &PolicyHistoryEntry) -> Result<(), PortError> {
        self.appended.push(entry.clone());
        Ok(())
    }

    async fn history(&mut self, policy: PolicyId) -> Result<Vec<PolicyHistoryEntry>, PortError> {
        let committed = self.guard.history.get(&policy).map(Vec::as_slice).unwrap_or_default();
        Ok(committed
            .iter()
            .chain(self.appended.iter().filter(|e| e.policy == policy))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        if self.fail_commit {
            return Err(PortError::connection("commit rejected by test hook"));
        }
        let InMemoryTransaction {
            mut guard,
            pools,
            policies,
            appended,
            ..
        } = *self;
        guard.pools.extend(pools);
        guard.policies.extend(policies);
        for entry in appended {
            guard.history.entry(entry.policy).or_default().push(entry);
        }
        tracing::trace!("In-memory transaction committed");
        Ok(())
    }
}
