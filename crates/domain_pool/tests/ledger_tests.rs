//! Integration tests for the fund ledger

use chrono::Utc;
use core_kernel::{Identity, Lamports, PoolId};
use domain_pool::{CreditSource, DebitSink, FundLedger, InsurancePool, LedgerError};

fn new_pool() -> InsurancePool {
    InsurancePool::new(PoolId::new_v7(), Identity::new_v7(), 0, Utc::now())
}

// ============================================================================
// Purchase / payout lifecycle
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_deposit_then_claim_larger_than_balance() {
        let mut pool = new_pool();
        FundLedger::credit(&mut pool, Lamports::new(1000), CreditSource::Deposit).unwrap();
        FundLedger::record_premium(&mut pool, Lamports::new(100)).unwrap();
        FundLedger::commit_coverage(&mut pool, Lamports::new(5000)).unwrap();

        assert!(!FundLedger::can_cover(&pool, Lamports::new(5000)));
        let err = FundLedger::debit(&mut pool, Lamports::new(5000), DebitSink::ClaimPayout)
            .unwrap_err();
        assert!(err.is_insufficient_funds());
        assert_eq!(pool.total_balance, Lamports::new(1000));
        assert_eq!(pool.totals.premiums, Lamports::new(100));
    }

    #[test]
    fn test_contribution_makes_claim_payable() {
        let mut pool = new_pool();
        FundLedger::credit(&mut pool, Lamports::new(1000), CreditSource::Deposit).unwrap();
        FundLedger::commit_coverage(&mut pool, Lamports::new(5000)).unwrap();
        FundLedger::credit(&mut pool, Lamports::new(4000), CreditSource::Contribution).unwrap();

        FundLedger::debit(&mut pool, Lamports::new(5000), DebitSink::ClaimPayout).unwrap();
        FundLedger::release_coverage(&mut pool, Lamports::new(5000)).unwrap();

        assert!(pool.total_balance.is_zero());
        assert!(pool.outstanding_coverage.is_zero());
        assert_eq!(pool.active_policies, 0);
        assert_eq!(pool.totals.claims_paid, Lamports::new(5000));
        FundLedger::reconcile(&pool).unwrap();
    }
}

// ============================================================================
// Solvency checks
// ============================================================================

mod solvency_tests {
    use super::*;

    #[test]
    fn test_ensure_backed_counts_outstanding_coverage() {
        let mut pool = new_pool();
        FundLedger::credit(&mut pool, Lamports::new(6000), CreditSource::Contribution).unwrap();
        FundLedger::commit_coverage(&mut pool, Lamports::new(5000)).unwrap();

        assert!(FundLedger::ensure_backed(&pool, Lamports::new(1000)).is_ok());
        assert_eq!(
            FundLedger::ensure_backed(&pool, Lamports::new(1001)),
            Err(LedgerError::InsufficientFunds {
                requested: Lamports::new(6001),
                available: Lamports::new(6000),
            })
        );
    }

    #[test]
    fn test_adjust_coverage_replaces_amount() {
        let mut pool = new_pool();
        FundLedger::commit_coverage(&mut pool, Lamports::new(5000)).unwrap();
        FundLedger::adjust_coverage(&mut pool, Lamports::new(5000), Lamports::new(2000)).unwrap();
        assert_eq!(pool.outstanding_coverage, Lamports::new(2000));
        assert_eq!(pool.active_policies, 1);
    }

    #[test]
    fn test_free_capital_after_withdrawal() {
        let mut pool = new_pool();
        FundLedger::credit(&mut pool, Lamports::new(10_000), CreditSource::Contribution).unwrap();
        FundLedger::commit_coverage(&mut pool, Lamports::new(4000)).unwrap();
        assert_eq!(FundLedger::free_capital(&pool), Lamports::new(6000));

        FundLedger::debit(&mut pool, Lamports::new(6000), DebitSink::Withdrawal).unwrap();
        assert!(FundLedger::free_capital(&pool).is_zero());
        FundLedger::reconcile(&pool).unwrap();
    }
}

mod serialization_tests {
    use super::*;

    #[test]
    fn test_pool_json_shape() {
        let pool = new_pool();
        let json = serde_json::to_value(&pool).unwrap();
        assert_eq!(json["total_balance"], 0);
        assert_eq!(json["bump"], 0);
        assert_eq!(json["totals"]["claims_paid"], 0);
    }
}
