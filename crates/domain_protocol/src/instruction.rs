//! The protocol's call surface
//!
//! An [`Instruction`] carries the ordered arguments of one call; the
//! [`AccountBindings`] name the records it touches and the verified signer.
//! A successful call returns a [`Receipt`] with the post-transition records.

use serde::{Deserialize, Serialize};

use core_kernel::{Identity, Lamports, PolicyId, PoolId};
use domain_policy::InsurancePolicy;
use domain_pool::InsurancePool;

/// A protocol call with its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum Instruction {
    /// Creates the pool in the bound pool slot; the signer becomes authority
    InitializePool { bump: u8 },
    /// Buys coverage from the bound pool; the signer becomes the holder
    PurchaseInsurance {
        deposit_amount: Lamports,
        premium_amount: Lamports,
        coverage_amount: Lamports,
    },
    /// Cancels the bound policy; signer must be the holder
    CancelPolicy,
    /// Approves and pays the claim on the bound policy; signer must be the authority
    ApproveClaim,
    /// Adds capital to the bound pool
    ContributeCapital { amount: Lamports },
    /// Withdraws free capital; signer must be the authority
    WithdrawSurplus { amount: Lamports },
    /// Changes the coverage of the bound policy; signer must be the holder
    AdjustCoverage { new_coverage_amount: Lamports },
    /// Expires the bound policy once its term is over
    ProcessExpiration,
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::InitializePool { .. } => "initialize_pool",
            Instruction::PurchaseInsurance { .. } => "purchase_insurance",
            Instruction::CancelPolicy => "cancel_policy",
            Instruction::ApproveClaim => "approve_claim",
            Instruction::ContributeCapital { .. } => "contribute_capital",
            Instruction::WithdrawSurplus { .. } => "withdraw_surplus",
            Instruction::AdjustCoverage { .. } => "adjust_coverage",
            Instruction::ProcessExpiration => "process_expiration",
        }
    }

    /// True for instructions that act on an existing policy
    pub fn requires_policy(&self) -> bool {
        matches!(
            self,
            Instruction::CancelPolicy
                | Instruction::ApproveClaim
                | Instruction::AdjustCoverage { .. }
                | Instruction::ProcessExpiration
        )
    }
}

/// Records and signer bound to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBindings {
    pub pool: PoolId,
    /// Policy slot; optional for purchases, where a fresh slot is generated
    pub policy: Option<PolicyId>,
    /// Verified caller identity
    pub signer: Identity,
}

impl AccountBindings {
    pub fn new(pool: PoolId, signer: Identity) -> Self {
        Self {
            pool,
            policy: None,
            signer,
        }
    }

    pub fn with_policy(mut self, policy: PolicyId) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// Why funds left the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Refund,
    ClaimPayout,
    Withdrawal,
}

/// Funds paid out of the pool by a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: Identity,
    pub amount: Lamports,
    pub kind: TransferKind,
}

/// Result of a successful call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub pool: InsurancePool,
    pub policy: Option<InsurancePolicy>,
    pub transfer: Option<Transfer>,
}

impl Receipt {
    pub(crate) fn pool(pool: InsurancePool) -> Self {
        Self {
            pool,
            policy: None,
            transfer: None,
        }
    }

    pub(crate) fn with_policy(mut self, policy: InsurancePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub(crate) fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer).filter(|t| !t.amount.is_zero());
        self
    }
}
