//! Custom Test Assertions
//!
//! Assertion helpers for pools, policies and protocol errors that print the
//! whole record on failure.

use core_kernel::Lamports;
use domain_policy::{InsurancePolicy, PolicyStatus};
use domain_pool::{FundLedger, InsurancePool};
use domain_protocol::{ErrorKind, ProtocolError};

/// Asserts that the pool balance equals the net of its recorded flows
///
/// # Panics
///
/// Panics if the balance does not reconcile
pub fn assert_conserved(pool: &InsurancePool) {
    if let Err(e) = FundLedger::reconcile(pool) {
        panic!("Pool {} does not reconcile: {}\n{:#?}", pool.id, e, pool);
    }
}

/// Asserts the pool's balance
pub fn assert_balance(pool: &InsurancePool, expected: u64) {
    assert_eq!(
        pool.total_balance,
        Lamports::new(expected),
        "Unexpected balance for pool {}",
        pool.id
    );
}

/// Asserts that a result failed with the given error kind
///
/// # Panics
///
/// Panics if the result is `Ok` or carries a different kind
pub fn assert_error_kind<T: std::fmt::Debug>(result: &Result<T, ProtocolError>, expected: ErrorKind) {
    match result {
        Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        Err(error) => assert_eq!(
            error.kind(),
            expected,
            "Expected {:?} error, got {:?}: {}",
            expected,
            error.kind(),
            error
        ),
    }
}

/// Asserts that a policy left the active state with the given status
pub fn assert_terminal(policy: &InsurancePolicy, expected: PolicyStatus) {
    assert!(
        expected.is_terminal(),
        "{} is not a terminal status",
        expected
    );
    assert_eq!(policy.status(), expected, "Unexpected status for {}", policy.id());
    assert!(!policy.is_active());
}

/// Asserts that a policy is active with no claim approved
pub fn assert_active(policy: &InsurancePolicy) {
    assert!(
        policy.is_active(),
        "Expected {} to be active, status is {}",
        policy.id(),
        policy.status()
    );
    assert!(!policy.claim_approved());
}
