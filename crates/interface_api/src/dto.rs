//! Request and response shapes
//!
//! Views carry every amount both in lamports and in SOL.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Identity, Lamports, PolicyId, PoolId};
use domain_policy::{InsurancePolicy, PolicyHistoryEntry, PolicyStatus};
use domain_pool::{InsurancePool, PoolTotals};
use domain_protocol::{AccountBindings, Instruction, PoolAudit, Receipt, Transfer, TransferKind};

/// An amount in both units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountView {
    pub lamports: u64,
    pub sol: Decimal,
}

impl From<Lamports> for AmountView {
    fn from(amount: Lamports) -> Self {
        Self {
            lamports: amount.get(),
            sol: amount.to_sol(),
        }
    }
}

/// A signed call: the instruction plus the records it binds
///
/// ```json
/// { "pool": "0192…", "policy": "0192…",
///   "instruction": { "instruction": "cancel_policy" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRequest {
    pub pool: PoolId,
    #[serde(default)]
    pub policy: Option<PolicyId>,
    pub instruction: Instruction,
}

impl InstructionRequest {
    pub fn new(pool: PoolId, instruction: Instruction) -> Self {
        Self {
            pool,
            policy: None,
            instruction,
        }
    }

    pub fn with_policy(mut self, policy: PolicyId) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn bindings(&self, signer: Identity) -> AccountBindings {
        AccountBindings {
            pool: self.pool,
            policy: self.policy,
            signer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolView {
    pub id: PoolId,
    pub authority: Identity,
    pub bump: u8,
    pub balance: AmountView,
    pub outstanding_coverage: AmountView,
    pub free_capital: AmountView,
    pub active_policies: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<&InsurancePool> for PoolView {
    fn from(pool: &InsurancePool) -> Self {
        Self {
            id: pool.id,
            authority: pool.authority,
            bump: pool.bump,
            balance: pool.total_balance.into(),
            outstanding_coverage: pool.outstanding_coverage.into(),
            free_capital: pool.free_capital().into(),
            active_policies: pool.active_policies,
            updated_at: pool.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub id: PolicyId,
    pub pool: PoolId,
    pub user: Identity,
    pub status: PolicyStatus,
    pub is_active: bool,
    pub claim_approved: bool,
    pub deposit: AmountView,
    pub premium: AmountView,
    pub coverage: AmountView,
    pub refunded: AmountView,
    pub paid_out: AmountView,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&InsurancePolicy> for PolicyView {
    fn from(policy: &InsurancePolicy) -> Self {
        Self {
            id: policy.id(),
            pool: policy.pool(),
            user: policy.user(),
            status: policy.status(),
            is_active: policy.is_active(),
            claim_approved: policy.claim_approved(),
            deposit: policy.deposit_amount().into(),
            premium: policy.premium_amount().into(),
            coverage: policy.coverage_amount().into(),
            refunded: policy.refunded_amount().into(),
            paid_out: policy.paid_out_amount().into(),
            start_time: policy.start_time(),
            end_time: policy.end_time(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    pub recipient: Identity,
    pub amount: AmountView,
    pub kind: TransferKind,
}

impl From<Transfer> for TransferView {
    fn from(transfer: Transfer) -> Self {
        Self {
            recipient: transfer.recipient,
            amount: transfer.amount.into(),
            kind: transfer.kind,
        }
    }
}

/// Result of a submitted instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptView {
    pub instruction: String,
    pub signer: Identity,
    pub pool: PoolView,
    pub policy: Option<PolicyView>,
    pub transfer: Option<TransferView>,
}

impl ReceiptView {
    pub fn new(instruction: &Instruction, signer: Identity, receipt: &Receipt) -> Self {
        Self {
            instruction: instruction.name().to_string(),
            signer,
            pool: PoolView::from(&receipt.pool),
            policy: receipt.policy.as_ref().map(PolicyView::from),
            transfer: receipt.transfer.map(TransferView::from),
        }
    }
}

/// Pool status with its accounting audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatusView {
    pub pool: PoolView,
    pub coverage_ratio: Option<Decimal>,
    pub totals: PoolTotals,
    pub balanced: bool,
}

impl From<&PoolAudit> for PoolView {
    fn from(audit: &PoolAudit) -> Self {
        Self {
            id: audit.pool,
            authority: audit.authority,
            bump: audit.bump,
            balance: audit.balance.into(),
            outstanding_coverage: audit.outstanding_coverage.into(),
            free_capital: audit.free_capital.into(),
            active_policies: audit.active_policies,
            updated_at: audit.updated_at,
        }
    }
}

impl PoolStatusView {
    /// Builds the view from one audit snapshot
    pub fn new(audit: &PoolAudit) -> Self {
        Self {
            pool: PoolView::from(audit),
            coverage_ratio: audit.coverage_ratio,
            totals: audit.totals,
            balanced: audit.balanced,
        }
    }
}

/// Policy status with its history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatusView {
    pub policy: PolicyView,
    pub history: Vec<PolicyHistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_view_in_sol() {
        let view = AmountView::from(Lamports::new(2_500_000_000));
        assert_eq!(view.lamports, 2_500_000_000);
        assert_eq!(view.sol, dec!(2.5));
    }

    #[test]
    fn test_request_wire_format() {
        let pool = PoolId::new_v7();
        let json = format!(
            r#"{{"pool":"{}","instruction":{{"instruction":"contribute_capital","amount":500}}}}"#,
            pool.as_uuid()
        );
        let request: InstructionRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(request.pool, pool);
        assert_eq!(request.policy, None);
        assert_eq!(
            request.instruction,
            Instruction::ContributeCapital { amount: Lamports::new(500) }
        );
    }
}
