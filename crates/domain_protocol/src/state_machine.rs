//! Protocol state machine
//!
//! [`InsuranceProtocol`] implements every protocol call as a single store
//! transaction: load and lock the records, validate, apply the transition in
//! memory, stage the writes and commit. Any error returns before the commit,
//! the transaction is dropped, and no record changes.
//!
//! Records are always locked pool first, then policy.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{
    Clock, CoverageTerm, Identity, Lamports, PolicyId, PoolId, PortError, SystemClock,
};
use domain_policy::{
    InsurancePolicy, PolicyAmounts, PolicyError, PolicyEvent, PolicyHistoryEntry,
};
use domain_pool::{CreditSource, DebitSink, FundLedger, InsurancePool, PoolTotals};

use crate::config::{ProtocolConfig, PurchaseSolvency};
use crate::error::{ProtocolError, RequiredRole};
use crate::instruction::{AccountBindings, Instruction, Receipt, Transfer, TransferKind};
use crate::ports::{ProtocolStore, StoreTransaction};

/// Point-in-time accounting view of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAudit {
    pub pool: PoolId,
    pub authority: Identity,
    pub bump: u8,
    pub balance: Lamports,
    pub outstanding_coverage: Lamports,
    pub free_capital: Lamports,
    pub active_policies: u64,
    /// Balance divided by outstanding coverage
    pub coverage_ratio: Option<Decimal>,
    pub totals: PoolTotals,
    /// Whether the balance matches the net of all recorded flows
    pub balanced: bool,
    pub updated_at: DateTime<Utc>,
}

/// The insurance protocol
pub struct InsuranceProtocol {
    store: Arc<dyn ProtocolStore>,
    clock: Arc<dyn Clock>,
    config: ProtocolConfig,
}

impl fmt::Debug for InsuranceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsuranceProtocol")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InsuranceProtocol {
    /// Creates a protocol over `store` using the system clock
    pub fn new(store: Arc<dyn ProtocolStore>, config: ProtocolConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn ProtocolStore>,
        clock: Arc<dyn Clock>,
        config: ProtocolConfig,
    ) -> Self {
        Self { store, clock, config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ProtocolStore> {
        &self.store
    }

    /// Executes one instruction against the bound accounts
    ///
    /// # Errors
    ///
    /// Returns the operation's `ProtocolError`; policy instructions without a
    /// bound policy fail with `PolicyNotFound`
    pub async fn execute(
        &self,
        instruction: Instruction,
        accounts: AccountBindings,
    ) -> Result<Receipt, ProtocolError> {
        let result = self.dispatch(instruction, accounts).await;
        if let Err(error) = &result {
            warn!(
                instruction = instruction.name(),
                signer = %accounts.signer,
                pool = %accounts.pool,
                kind = ?error.kind(),
                retryable = error.is_retryable(),
                %error,
                "Instruction rejected"
            );
        }
        result
    }

    async fn dispatch(
        &self,
        instruction: Instruction,
        accounts: AccountBindings,
    ) -> Result<Receipt, ProtocolError> {
        let signer = accounts.signer;
        let pool = accounts.pool;

        match instruction {
            Instruction::InitializePool { bump } => self.initialize_pool(signer, pool, bump).await,
            Instruction::PurchaseInsurance {
                deposit_amount,
                premium_amount,
                coverage_amount,
            } => {
                let amounts = PolicyAmounts {
                    deposit: deposit_amount,
                    premium: premium_amount,
                    coverage: coverage_amount,
                };
                self.purchase_insurance(signer, pool, accounts.policy, amounts)
                    .await
            }
            Instruction::CancelPolicy => {
                self.cancel_policy(signer, pool, bound_policy(&accounts)?).await
            }
            Instruction::ApproveClaim => {
                self.approve_claim(signer, pool, bound_policy(&accounts)?).await
            }
            Instruction::ContributeCapital { amount } => {
                self.contribute_capital(signer, pool, amount).await
            }
            Instruction::WithdrawSurplus { amount } => {
                self.withdraw_surplus(signer, pool, amount).await
            }
            Instruction::AdjustCoverage { new_coverage_amount } => {
                self.adjust_coverage(signer, pool, bound_policy(&accounts)?, new_coverage_amount)
                    .await
            }
            Instruction::ProcessExpiration => {
                self.process_expiration(signer, pool, bound_policy(&accounts)?)
                    .await
            }
        }
    }

    /// Creates a pool in a fresh slot with `caller` as its authority
    ///
    /// # Arguments
    ///
    /// * `caller` - Verified signer; becomes the pool authority
    /// * `pool_id` - The pool slot to initialize
    /// * `bump` - Derivation parameter of the pool's sub-account
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::AlreadyInitialized` if the slot holds a pool
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id))]
    pub async fn initialize_pool(
        &self,
        caller: Identity,
        pool_id: PoolId,
        bump: u8,
    ) -> Result<Receipt, ProtocolError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        if tx.pool_for_update(pool_id).await?.is_some() {
            return Err(ProtocolError::AlreadyInitialized(pool_id.to_string()));
        }

        let pool = InsurancePool::new(pool_id, caller, bump, now);
        tx.insert_pool(&pool)
            .await
            .map_err(|e| slot_taken(e, pool_id))?;
        tx.commit().await?;

        info!(bump, "Pool initialized");
        Ok(Receipt::pool(pool))
    }

    /// Buys coverage from a pool
    ///
    /// The deposit is credited to the pool and the coverage is added to the
    /// pool's outstanding commitments. Under `PurchaseSolvency::Strict` the
    /// purchase is rejected if the balance cannot back all outstanding
    /// coverage afterwards.
    ///
    /// # Arguments
    ///
    /// * `caller` - Verified signer; becomes the policy holder
    /// * `pool_id` - Pool to buy from
    /// * `policy_slot` - Slot for the new policy; generated when `None`
    /// * `amounts` - Deposit, premium and coverage
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a zero deposit or premium, or coverage below the premium
    /// - `PoolNotFound` if the pool does not exist
    /// - `AlreadyInitialized` if the policy slot is taken
    /// - `InsufficientFunds` under strict solvency
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id))]
    pub async fn purchase_insurance(
        &self,
        caller: Identity,
        pool_id: PoolId,
        policy_slot: Option<PolicyId>,
        amounts: PolicyAmounts,
    ) -> Result<Receipt, ProtocolError> {
        amounts.validate()?;

        let now = self.clock.now();
        let term = CoverageTerm::starting_at(now, i64::from(self.config.coverage_term_days))
            .map_err(PolicyError::from)?;
        let policy_id = policy_slot.unwrap_or_else(PolicyId::new_v7);

        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;

        if tx.policy_for_update(policy_id).await?.is_some() {
            return Err(ProtocolError::AlreadyInitialized(policy_id.to_string()));
        }

        let mut policy = InsurancePolicy::purchase(policy_id, pool_id, caller, amounts, term)?;

        FundLedger::credit(&mut pool, amounts.deposit, CreditSource::Deposit)?;
        if self.config.purchase_solvency == PurchaseSolvency::Strict {
            FundLedger::ensure_backed(&pool, amounts.coverage)?;
        }
        FundLedger::record_premium(&mut pool, amounts.premium)?;
        FundLedger::commit_coverage(&mut pool, amounts.coverage)?;
        pool.touch(now);

        let events = policy.take_events();
        tx.insert_policy(&policy)
            .await
            .map_err(|e| slot_taken(e, policy_id))?;
        tx.update_pool(&pool).await?;
        record_history(tx.as_mut(), &events, pool_id, caller).await?;
        tx.commit().await?;

        info!(
            policy = %policy_id,
            deposit = %amounts.deposit,
            premium = %amounts.premium,
            coverage = %amounts.coverage,
            balance = %pool.total_balance,
            "Policy purchased"
        );
        Ok(Receipt::pool(pool).with_policy(policy))
    }

    /// Cancels a policy at its holder's request
    ///
    /// The refund is computed by the configured `RefundPolicy` (the full
    /// deposit by default) and debited from the pool. The premium is kept.
    ///
    /// # Errors
    ///
    /// - `PoolNotFound` / `PolicyNotFound` / `PoolMismatch` for bad bindings
    /// - `Unauthorized` if `caller` is not the policy holder
    /// - `PolicyNotActive` if the policy already left the active state
    /// - `PolicyExpired` if the coverage term is over
    /// - `InsufficientFunds` if the pool cannot pay the refund
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id, policy = %policy_id))]
    pub async fn cancel_policy(
        &self,
        caller: Identity,
        pool_id: PoolId,
        policy_id: PolicyId,
    ) -> Result<Receipt, ProtocolError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;
        let mut policy = load_policy(tx.as_mut(), &pool, policy_id).await?;

        if !policy.is_owned_by(&caller) {
            return Err(ProtocolError::unauthorized(caller, RequiredRole::PolicyHolder));
        }

        let refund = self.config.refund_policy.refund_for(&policy, now);
        policy.cancel(refund, now)?;
        FundLedger::debit(&mut pool, refund, DebitSink::Refund)?;
        FundLedger::release_coverage(&mut pool, policy.coverage_amount())?;
        pool.touch(now);

        let events = policy.take_events();
        tx.update_policy(&policy).await?;
        tx.update_pool(&pool).await?;
        record_history(tx.as_mut(), &events, pool_id, caller).await?;
        tx.commit().await?;

        info!(%refund, balance = %pool.total_balance, "Policy canceled");
        let transfer = Transfer {
            recipient: policy.user(),
            amount: refund,
            kind: TransferKind::Refund,
        };
        Ok(Receipt::pool(pool).with_policy(policy).with_transfer(transfer))
    }

    /// Approves the claim on a policy and pays its coverage from the pool
    ///
    /// A claim the pool cannot pay is rejected with `InsufficientFunds` and
    /// stays approvable once the pool has been funded.
    ///
    /// # Errors
    ///
    /// - `PoolNotFound` / `PolicyNotFound` / `PoolMismatch` for bad bindings
    /// - `Unauthorized` if `caller` is not the pool authority
    /// - `ClaimAlreadyApproved` on a second approval
    /// - `PolicyNotActive` if the policy was canceled or expired
    /// - `InsufficientFunds` if the coverage exceeds the pool balance
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id, policy = %policy_id))]
    pub async fn approve_claim(
        &self,
        caller: Identity,
        pool_id: PoolId,
        policy_id: PolicyId,
    ) -> Result<Receipt, ProtocolError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;
        let mut policy = load_policy(tx.as_mut(), &pool, policy_id).await?;

        if !pool.is_authority(&caller) {
            return Err(ProtocolError::unauthorized(caller, RequiredRole::PoolAuthority));
        }

        let payout = policy.approve_claim(now)?;
        FundLedger::debit(&mut pool, payout, DebitSink::ClaimPayout)?;
        FundLedger::release_coverage(&mut pool, payout)?;
        pool.touch(now);

        let events = policy.take_events();
        tx.update_policy(&policy).await?;
        tx.update_pool(&pool).await?;
        record_history(tx.as_mut(), &events, pool_id, caller).await?;
        tx.commit().await?;

        info!(%payout, balance = %pool.total_balance, "Claim approved");
        let transfer = Transfer {
            recipient: policy.user(),
            amount: payout,
            kind: TransferKind::ClaimPayout,
        };
        Ok(Receipt::pool(pool).with_policy(policy).with_transfer(transfer))
    }

    /// Adds capital to a pool
    ///
    /// Anyone may contribute. Contributions back outstanding coverage and make
    /// previously unpayable claims payable.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a zero amount
    /// - `PoolNotFound` if the pool does not exist
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id))]
    pub async fn contribute_capital(
        &self,
        caller: Identity,
        pool_id: PoolId,
        amount: Lamports,
    ) -> Result<Receipt, ProtocolError> {
        if amount.is_zero() {
            return Err(ProtocolError::InvalidAmount(
                "contribution must be greater than zero".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;

        FundLedger::credit(&mut pool, amount, CreditSource::Contribution)?;
        pool.touch(now);
        tx.update_pool(&pool).await?;
        tx.commit().await?;

        info!(%amount, balance = %pool.total_balance, "Capital contributed");
        Ok(Receipt::pool(pool))
    }

    /// Withdraws capital not committed to outstanding coverage
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a zero amount
    /// - `Unauthorized` if `caller` is not the pool authority
    /// - `InsufficientFunds` if `amount` exceeds the pool's free capital
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id))]
    pub async fn withdraw_surplus(
        &self,
        caller: Identity,
        pool_id: PoolId,
        amount: Lamports,
    ) -> Result<Receipt, ProtocolError> {
        if amount.is_zero() {
            return Err(ProtocolError::InvalidAmount(
                "withdrawal must be greater than zero".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;

        if !pool.is_authority(&caller) {
            return Err(ProtocolError::unauthorized(caller, RequiredRole::PoolAuthority));
        }

        let free = FundLedger::free_capital(&pool);
        if amount > free {
            return Err(ProtocolError::InsufficientFunds {
                requested: amount,
                available: free,
            });
        }
        FundLedger::debit(&mut pool, amount, DebitSink::Withdrawal)?;
        pool.touch(now);
        tx.update_pool(&pool).await?;
        tx.commit().await?;

        info!(%amount, balance = %pool.total_balance, "Surplus withdrawn");
        let transfer = Transfer {
            recipient: caller,
            amount,
            kind: TransferKind::Withdrawal,
        };
        Ok(Receipt::pool(pool).with_transfer(transfer))
    }

    /// Changes the coverage limit of an active policy
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `caller` is not the policy holder
    /// - `PolicyNotActive` / `PolicyExpired` if coverage is no longer in force
    /// - `InvalidAmount` if the new coverage is below the premium
    /// - `InsufficientFunds` for an increase the balance cannot back under
    ///   strict solvency
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id, policy = %policy_id))]
    pub async fn adjust_coverage(
        &self,
        caller: Identity,
        pool_id: PoolId,
        policy_id: PolicyId,
        new_coverage: Lamports,
    ) -> Result<Receipt, ProtocolError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;
        let mut policy = load_policy(tx.as_mut(), &pool, policy_id).await?;

        if !policy.is_owned_by(&caller) {
            return Err(ProtocolError::unauthorized(caller, RequiredRole::PolicyHolder));
        }

        let previous = policy.adjust_coverage(new_coverage, now)?;
        FundLedger::adjust_coverage(&mut pool, previous, new_coverage)?;
        if self.config.purchase_solvency == PurchaseSolvency::Strict && new_coverage > previous {
            FundLedger::ensure_backed(&pool, Lamports::ZERO)?;
        }
        pool.touch(now);

        let events = policy.take_events();
        tx.update_policy(&policy).await?;
        tx.update_pool(&pool).await?;
        record_history(tx.as_mut(), &events, pool_id, caller).await?;
        tx.commit().await?;

        info!(%previous, current = %new_coverage, "Coverage adjusted");
        Ok(Receipt::pool(pool).with_policy(policy))
    }

    /// Expires a policy whose coverage term is over
    ///
    /// Anyone may call this. The holder receives the refund the configured
    /// `RefundPolicy` grants at the end of the term.
    ///
    /// # Errors
    ///
    /// - `PolicyNotActive` if the policy already left the active state
    /// - `PolicyNotExpired` if the term is still running
    /// - `InsufficientFunds` if the pool cannot pay the refund
    #[instrument(skip_all, fields(caller = %caller, pool = %pool_id, policy = %policy_id))]
    pub async fn process_expiration(
        &self,
        caller: Identity,
        pool_id: PoolId,
        policy_id: PolicyId,
    ) -> Result<Receipt, ProtocolError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut pool = load_pool(tx.as_mut(), pool_id).await?;
        let mut policy = load_policy(tx.as_mut(), &pool, policy_id).await?;

        let refund = self.config.refund_policy.refund_for(&policy, policy.end_time());
        policy.expire(refund, now)?;
        FundLedger::debit(&mut pool, refund, DebitSink::Refund)?;
        FundLedger::release_coverage(&mut pool, policy.coverage_amount())?;
        pool.touch(now);

        let events = policy.take_events();
        tx.update_policy(&policy).await?;
        tx.update_pool(&pool).await?;
        record_history(tx.as_mut(), &events, pool_id, caller).await?;
        tx.commit().await?;

        info!(%refund, balance = %pool.total_balance, "Policy expired");
        let transfer = Transfer {
            recipient: policy.user(),
            amount: refund,
            kind: TransferKind::Refund,
        };
        Ok(Receipt::pool(pool).with_policy(policy).with_transfer(transfer))
    }

    /// Reads a pool
    pub async fn pool(&self, pool_id: PoolId) -> Result<InsurancePool, ProtocolError> {
        let mut tx = self.store.begin().await?;
        load_pool(tx.as_mut(), pool_id).await
    }

    /// Reads a policy
    pub async fn policy(&self, policy_id: PolicyId) -> Result<InsurancePolicy, ProtocolError> {
        let mut tx = self.store.begin().await?;
        tx.policy_for_update(policy_id)
            .await?
            .ok_or_else(|| ProtocolError::PolicyNotFound(policy_id.to_string()))
    }

    /// Reads a policy's history, oldest first
    pub async fn policy_history(
        &self,
        policy_id: PolicyId,
    ) -> Result<Vec<PolicyHistoryEntry>, ProtocolError> {
        let mut tx = self.store.begin().await?;
        if tx.policy_for_update(policy_id).await?.is_none() {
            return Err(ProtocolError::PolicyNotFound(policy_id.to_string()));
        }
        Ok(tx.history(policy_id).await?)
    }

    /// Reports a pool's accounting position and checks its conservation
    pub async fn audit_pool(&self, pool_id: PoolId) -> Result<PoolAudit, ProtocolError> {
        let pool = self.pool(pool_id).await?;
        let balanced = FundLedger::reconcile(&pool).is_ok();
        if !balanced {
            warn!(pool = %pool_id, "Pool balance does not match recorded flows");
        }

        Ok(PoolAudit {
            pool: pool.id,
            authority: pool.authority,
            bump: pool.bump,
            balance: pool.total_balance,
            outstanding_coverage: pool.outstanding_coverage,
            free_capital: pool.free_capital(),
            active_policies: pool.active_policies,
            coverage_ratio: pool.coverage_ratio(),
            totals: pool.totals,
            balanced,
            updated_at: pool.updated_at,
        })
    }
}

fn bound_policy(accounts: &AccountBindings) -> Result<PolicyId, ProtocolError> {
    accounts
        .policy
        .ok_or_else(|| ProtocolError::PolicyNotFound("no policy account bound".to_string()))
}

fn slot_taken(error: PortError, slot: impl fmt::Display) -> ProtocolError {
    if error.is_conflict() {
        ProtocolError::AlreadyInitialized(slot.to_string())
    } else {
        ProtocolError::Storage(error)
    }
}

async fn load_pool(
    tx: &mut dyn StoreTransaction,
    pool_id: PoolId,
) -> Result<InsurancePool, ProtocolError> {
    tx.pool_for_update(pool_id)
        .await?
        .ok_or(ProtocolError::PoolNotFound(pool_id))
}

async fn load_policy(
    tx: &mut dyn StoreTransaction,
    pool: &InsurancePool,
    policy_id: PolicyId,
) -> Result<InsurancePolicy, ProtocolError> {
    let policy = tx
        .policy_for_update(policy_id)
        .await?
        .ok_or_else(|| ProtocolError::PolicyNotFound(policy_id.to_string()))?;

    if policy.pool() != pool.id {
        return Err(ProtocolError::PoolMismatch {
            policy: policy_id,
            expected: pool.id,
            actual: policy.pool(),
        });
    }
    Ok(policy)
}

async fn record_history(
    tx: &mut dyn StoreTransaction,
    events: &[PolicyEvent],
    pool_id: PoolId,
    actor: Identity,
) -> Result<(), ProtocolError> {
    for event in events {
        let entry = PolicyHistoryEntry::from_event(event, pool_id, actor);
        tx.append_history(&entry).await?;
    }
    Ok(())
}
