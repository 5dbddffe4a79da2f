//! Property-Based Test Generators
//!
//! Proptest strategies for purchase amounts and random sequences of protocol
//! calls.

use proptest::prelude::*;

use core_kernel::Lamports;
use domain_policy::PolicyAmounts;

/// One protocol call in a generated sequence
///
/// Policy references are indexes into the list of policies purchased so far
/// and wrap around, so every reference resolves once a policy exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolOp {
    Purchase { holder: usize, amounts: PolicyAmounts },
    Cancel { policy: usize },
    Approve { policy: usize },
    Contribute { amount: u64 },
    Withdraw { amount: u64 },
    AdjustCoverage { policy: usize, coverage: u64 },
    Expire { policy: usize },
    AdvanceDays { days: i64 },
}

/// Valid purchase amounts
pub fn policy_amounts_strategy() -> impl Strategy<Value = PolicyAmounts> {
    (1u64..100_000, 1u64..10_000, 0u64..200_000).prop_map(|(deposit, premium, extra)| {
        PolicyAmounts {
            deposit: Lamports::new(deposit),
            premium: Lamports::new(premium),
            coverage: Lamports::new(premium + extra),
        }
    })
}

/// Any purchase amounts, including invalid ones
pub fn any_policy_amounts_strategy() -> impl Strategy<Value = PolicyAmounts> {
    (0u64..1_000, 0u64..1_000, 0u64..1_000)
        .prop_map(|(deposit, premium, coverage)| PolicyAmounts::new(deposit, premium, coverage))
}

/// A single protocol call
pub fn protocol_op_strategy() -> impl Strategy<Value = ProtocolOp> {
    prop_oneof![
        3 => (0usize..3, policy_amounts_strategy())
            .prop_map(|(holder, amounts)| ProtocolOp::Purchase { holder, amounts }),
        2 => any::<usize>().prop_map(|policy| ProtocolOp::Cancel { policy }),
        2 => any::<usize>().prop_map(|policy| ProtocolOp::Approve { policy }),
        2 => (1u64..300_000).prop_map(|amount| ProtocolOp::Contribute { amount }),
        1 => (1u64..300_000).prop_map(|amount| ProtocolOp::Withdraw { amount }),
        1 => (any::<usize>(), 1u64..200_000)
            .prop_map(|(policy, coverage)| ProtocolOp::AdjustCoverage { policy, coverage }),
        1 => any::<usize>().prop_map(|policy| ProtocolOp::Expire { policy }),
        1 => (1i64..40).prop_map(|days| ProtocolOp::AdvanceDays { days }),
    ]
}

/// A sequence of up to `max_len` protocol calls
pub fn protocol_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<ProtocolOp>> {
    prop::collection::vec(protocol_op_strategy(), 1..max_len)
}
