//! Test Harness Builders
//!
//! [`TestProtocolBuilder`] wires an [`InsuranceProtocol`] to an in-memory
//! store and a manual clock, and can initialize a pool up front.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use core_kernel::{Identity, Lamports, ManualClock, PolicyId, PoolId};
use domain_policy::{InsurancePolicy, PolicyAmounts};
use domain_pool::InsurancePool;
use domain_protocol::{
    InMemoryProtocolStore, InsuranceProtocol, ProtocolConfig, ProtocolError, PurchaseSolvency,
    RefundPolicy,
};

use crate::fixtures::{AmountFixtures, IdentityFixtures, TemporalFixtures};

/// Builder for a protocol under test
pub struct TestProtocolBuilder {
    config: ProtocolConfig,
    start: DateTime<Utc>,
    authority: Identity,
    pool_id: PoolId,
    bump: u8,
    initialize: bool,
    seed_capital: Lamports,
}

impl Default for TestProtocolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProtocolBuilder {
    pub fn new() -> Self {
        Self {
            config: ProtocolConfig::default(),
            start: TemporalFixtures::genesis(),
            authority: IdentityFixtures::authority(),
            pool_id: IdentityFixtures::pool_id(),
            bump: 0,
            initialize: true,
            seed_capital: Lamports::ZERO,
        }
    }

    pub fn with_config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_refund_policy(mut self, refund_policy: RefundPolicy) -> Self {
        self.config.refund_policy = refund_policy;
        self
    }

    pub fn strict_solvency(mut self) -> Self {
        self.config.purchase_solvency = PurchaseSolvency::Strict;
        self
    }

    pub fn with_authority(mut self, authority: Identity) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_bump(mut self, bump: u8) -> Self {
        self.bump = bump;
        self
    }

    /// Leaves the pool slot empty
    pub fn uninitialized(mut self) -> Self {
        self.initialize = false;
        self
    }

    /// Contributes capital to the pool after initialization
    pub fn with_seed_capital(mut self, amount: u64) -> Self {
        self.seed_capital = Lamports::new(amount);
        self
    }

    /// Builds the harness
    ///
    /// # Panics
    ///
    /// Panics if pool initialization or seeding fails
    pub async fn build(self) -> TestProtocol {
        let store = InMemoryProtocolStore::new();
        let clock = ManualClock::new(self.start);
        let protocol = InsuranceProtocol::with_clock(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            self.config,
        );

        let harness = TestProtocol {
            protocol: Arc::new(protocol),
            store,
            clock,
            authority: self.authority,
            pool_id: self.pool_id,
        };

        if self.initialize {
            harness
                .protocol
                .initialize_pool(self.authority, self.pool_id, self.bump)
                .await
                .expect("pool initialization failed");
        }
        if !self.seed_capital.is_zero() {
            harness
                .protocol
                .contribute_capital(self.authority, self.pool_id, self.seed_capital)
                .await
                .expect("seeding pool capital failed");
        }
        harness
    }
}

/// A protocol wired for tests
#[derive(Clone)]
pub struct TestProtocol {
    pub protocol: Arc<InsuranceProtocol>,
    pub store: InMemoryProtocolStore,
    pub clock: ManualClock,
    pub authority: Identity,
    pub pool_id: PoolId,
}

impl TestProtocol {
    /// Purchases coverage from the harness pool
    pub async fn purchase(
        &self,
        user: Identity,
        amounts: PolicyAmounts,
    ) -> Result<InsurancePolicy, ProtocolError> {
        let receipt = self
            .protocol
            .purchase_insurance(user, self.pool_id, None, amounts)
            .await?;
        receipt
            .policy
            .ok_or_else(|| ProtocolError::PolicyNotFound("purchase returned no policy".into()))
    }

    /// Purchases the standard 1000 / 100 / 5000 policy for the fixture user
    ///
    /// # Panics
    ///
    /// Panics if the purchase fails
    pub async fn purchase_standard(&self) -> PolicyId {
        self.purchase(IdentityFixtures::user(), AmountFixtures::standard_purchase())
            .await
            .expect("standard purchase failed")
            .id()
    }

    /// Committed pool record
    ///
    /// # Panics
    ///
    /// Panics if the pool does not exist
    pub async fn pool(&self) -> InsurancePool {
        self.store
            .pool(self.pool_id)
            .await
            .expect("harness pool missing")
    }

    /// Committed policy record
    ///
    /// # Panics
    ///
    /// Panics if the policy does not exist
    pub async fn policy(&self, id: PolicyId) -> InsurancePolicy {
        self.store.policy(id).await.expect("policy missing")
    }

    pub async fn balance(&self) -> Lamports {
        self.pool().await.total_balance
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance(Duration::days(days));
    }
}
