//! Insurance pool records
//!
//! A pool is created once by `initialize_pool` and lives for the lifetime of
//! the protocol. Its identity, authority and bump are fixed at creation; the
//! balance and counters change only through [`FundLedger`](crate::FundLedger).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Identity, Lamports, PoolId};

/// Cumulative flows through a pool, kept for audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    /// Deposits received with policy purchases
    pub deposits: Lamports,
    /// Premiums agreed at purchase (informational, not escrowed separately)
    pub premiums: Lamports,
    /// Deposits returned on cancellation or expiry
    pub refunds: Lamports,
    /// Coverage paid out on approved claims
    pub claims_paid: Lamports,
    /// Capital contributed directly to the pool
    pub contributions: Lamports,
    /// Surplus withdrawn by the pool authority
    pub withdrawals: Lamports,
}

/// The shared capital pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePool {
    pub id: PoolId,
    /// Identity permitted to approve claims and withdraw surplus
    pub authority: Identity,
    /// Funds currently held by the pool
    pub total_balance: Lamports,
    /// Derivation parameter of the pool's authority-controlled sub-account
    pub bump: u8,
    pub totals: PoolTotals,
    /// Sum of coverage limits over the pool's active policies
    pub outstanding_coverage: Lamports,
    pub active_policies: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsurancePool {
    /// Creates an empty pool controlled by `authority`
    pub fn new(id: PoolId, authority: Identity, bump: u8, now: DateTime<Utc>) -> Self {
        Self {
            id,
            authority,
            total_balance: Lamports::ZERO,
            bump,
            totals: PoolTotals::default(),
            outstanding_coverage: Lamports::ZERO,
            active_policies: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authority(&self, caller: &Identity) -> bool {
        &self.authority == caller
    }

    /// Balance not committed to outstanding coverage
    pub fn free_capital(&self) -> Lamports {
        self.total_balance.saturating_sub(self.outstanding_coverage)
    }

    /// Ratio of balance to outstanding coverage, `None` when nothing is outstanding
    pub fn coverage_ratio(&self) -> Option<Decimal> {
        if self.outstanding_coverage.is_zero() {
            return None;
        }
        Some(Decimal::from(self.total_balance) / Decimal::from(self.outstanding_coverage))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
