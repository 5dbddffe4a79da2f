//! Fund ledger
//!
//! All balance movements of a pool go through [`FundLedger`]. Each movement
//! updates the balance and the matching audit counter together, so the
//! conservation identity holds after every successful call. A failed call
//! leaves the pool untouched.

use tracing::debug;

use core_kernel::Lamports;
use crate::error::LedgerError;
use crate::pool::InsurancePool;

/// Where incoming funds come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditSource {
    /// Deposit paid with a policy purchase
    Deposit,
    /// Capital contributed directly to the pool
    Contribution,
}

/// Where outgoing funds go to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitSink {
    /// Deposit returned to a policyholder
    Refund,
    /// Coverage paid on an approved claim
    ClaimPayout,
    /// Surplus withdrawn by the pool authority
    Withdrawal,
}

/// Accounting operations over an [`InsurancePool`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FundLedger;

impl FundLedger {
    /// Adds `amount` to the pool balance
    ///
    /// # Arguments
    ///
    /// * `pool` - The pool to credit
    /// * `amount` - Amount received
    /// * `source` - Selects the audit counter to increase
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Arithmetic` if the balance would overflow
    pub fn credit(
        pool: &mut InsurancePool,
        amount: Lamports,
        source: CreditSource,
    ) -> Result<(), LedgerError> {
        let balance = pool.total_balance.checked_add(amount)?;
        let counter = match source {
            CreditSource::Deposit => &mut pool.totals.deposits,
            CreditSource::Contribution => &mut pool.totals.contributions,
        };
        *counter = counter.checked_add(amount)?;
        pool.total_balance = balance;

        debug!(pool = %pool.id, %amount, ?source, balance = %pool.total_balance, "Pool credited");
        Ok(())
    }

    /// Removes `amount` from the pool balance
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientFunds` if `amount` exceeds the balance
    pub fn debit(
        pool: &mut InsurancePool,
        amount: Lamports,
        sink: DebitSink,
    ) -> Result<(), LedgerError> {
        if !Self::can_cover(pool, amount) {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: pool.total_balance,
            });
        }
        let balance = pool.total_balance.checked_sub(amount)?;
        let counter = match sink {
            DebitSink::Refund => &mut pool.totals.refunds,
            DebitSink::ClaimPayout => &mut pool.totals.claims_paid,
            DebitSink::Withdrawal => &mut pool.totals.withdrawals,
        };
        *counter = counter.checked_add(amount)?;
        pool.total_balance = balance;

        debug!(pool = %pool.id, %amount, ?sink, balance = %pool.total_balance, "Pool debited");
        Ok(())
    }

    /// Returns true if the pool balance can pay `amount`
    pub fn can_cover(pool: &InsurancePool, amount: Lamports) -> bool {
        pool.total_balance >= amount
    }

    /// Balance not committed to outstanding coverage
    pub fn free_capital(pool: &InsurancePool) -> Lamports {
        pool.free_capital()
    }

    /// Records the premium agreed on a purchase
    pub fn record_premium(pool: &mut InsurancePool, premium: Lamports) -> Result<(), LedgerError> {
        pool.totals.premiums = pool.totals.premiums.checked_add(premium)?;
        Ok(())
    }

    /// Checks that the balance would still back all outstanding coverage plus
    /// `additional` more
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientFunds` with the total required coverage
    /// as `requested`
    pub fn ensure_backed(pool: &InsurancePool, additional: Lamports) -> Result<(), LedgerError> {
        let required = pool.outstanding_coverage.checked_add(additional)?;
        if pool.total_balance < required {
            return Err(LedgerError::InsufficientFunds {
                requested: required,
                available: pool.total_balance,
            });
        }
        Ok(())
    }

    /// Registers a newly active policy's coverage
    pub fn commit_coverage(pool: &mut InsurancePool, coverage: Lamports) -> Result<(), LedgerError> {
        pool.outstanding_coverage = pool.outstanding_coverage.checked_add(coverage)?;
        pool.active_policies += 1;
        Ok(())
    }

    /// Releases a policy's coverage when it leaves the active state
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CoverageAccounting` if the pool does not have that
    /// much coverage or no active policy on record
    pub fn release_coverage(pool: &mut InsurancePool, coverage: Lamports) -> Result<(), LedgerError> {
        if pool.active_policies == 0 {
            return Err(LedgerError::CoverageAccounting(format!(
                "pool {} has no active policies",
                pool.id
            )));
        }
        pool.outstanding_coverage = pool
            .outstanding_coverage
            .checked_sub(coverage)
            .map_err(|e| LedgerError::CoverageAccounting(e.to_string()))?;
        pool.active_policies -= 1;
        Ok(())
    }

    /// Replaces an active policy's coverage `from` with `to`
    pub fn adjust_coverage(
        pool: &mut InsurancePool,
        from: Lamports,
        to: Lamports,
    ) -> Result<(), LedgerError> {
        let without = pool
            .outstanding_coverage
            .checked_sub(from)
            .map_err(|e| LedgerError::CoverageAccounting(e.to_string()))?;
        pool.outstanding_coverage = without.checked_add(to)?;
        Ok(())
    }

    /// Verifies the conservation identity for a pool
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unbalanced` if the balance differs from the net of
    /// the audit counters
    pub fn reconcile(pool: &InsurancePool) -> Result<(), LedgerError> {
        let totals = &pool.totals;
        let inflow = totals.contributions.checked_add(totals.deposits)?;
        let outflow = Lamports::checked_sum([totals.refunds, totals.claims_paid, totals.withdrawals])?;
        let expected = inflow.checked_sub(outflow).map_err(|_| LedgerError::Unbalanced {
            expected: Lamports::ZERO,
            actual: pool.total_balance,
        })?;

        if expected != pool.total_balance {
            return Err(LedgerError::Unbalanced {
                expected,
                actual: pool.total_balance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{Identity, PoolId};

    fn pool_with(balance: u64) -> InsurancePool {
        let mut pool = InsurancePool::new(PoolId::new(), Identity::new(), 0, Utc::now());
        FundLedger::credit(&mut pool, Lamports::new(balance), CreditSource::Contribution).unwrap();
        pool
    }

    #[test]
    fn test_credit_moves_counter() {
        let mut pool = pool_with(0);
        FundLedger::credit(&mut pool, Lamports::new(1000), CreditSource::Deposit).unwrap();
        assert_eq!(pool.total_balance, Lamports::new(1000));
        assert_eq!(pool.totals.deposits, Lamports::new(1000));
        assert!(FundLedger::reconcile(&pool).is_ok());
    }

    #[test]
    fn test_debit_insufficient_leaves_pool_unchanged() {
        let mut pool = pool_with(1000);
        let before = pool.clone();
        let err = FundLedger::debit(&mut pool, Lamports::new(5000), DebitSink::ClaimPayout)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                requested: Lamports::new(5000),
                available: Lamports::new(1000),
            }
        );
        assert_eq!(pool, before);
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut pool = pool_with(1000);
        FundLedger::debit(&mut pool, Lamports::new(1000), DebitSink::Refund).unwrap();
        assert!(pool.total_balance.is_zero());
        assert_eq!(pool.totals.refunds, Lamports::new(1000));
        assert!(FundLedger::reconcile(&pool).is_ok());
    }

    #[test]
    fn test_release_without_active_policy_fails() {
        let mut pool = pool_with(0);
        assert!(matches!(
            FundLedger::release_coverage(&mut pool, Lamports::new(1)),
            Err(LedgerError::CoverageAccounting(_))
        ));
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let mut pool = pool_with(1000);
        pool.total_balance = Lamports::new(999);
        assert!(matches!(
            FundLedger::reconcile(&pool),
            Err(LedgerError::Unbalanced { .. })
        ));
    }
}
