//! Insurance policy records
//!
//! An [`InsurancePolicy`] is created by a purchase and changes state at most
//! once afterwards. Amounts and the pool back-reference are fixed at purchase
//! (coverage may be adjusted while the policy is active).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use core_kernel::{CoverageTerm, Identity, Lamports, PolicyId, PoolId};

use crate::error::PolicyError;
use crate::events::PolicyEvent;

/// Policy lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Coverage in force
    Active,
    /// Canceled by the holder
    Canceled,
    /// Claim approved and paid by the pool authority
    ClaimApproved,
    /// Coverage term ended without a claim
    Expired,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Canceled => "canceled",
            PolicyStatus::ClaimApproved => "claim_approved",
            PolicyStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PolicyStatus::Active)
    }

    /// Checks if a transition to `next` is valid
    pub fn can_transition_to(&self, next: PolicyStatus) -> bool {
        matches!(
            (self, next),
            (
                PolicyStatus::Active,
                PolicyStatus::Canceled | PolicyStatus::ClaimApproved | PolicyStatus::Expired
            )
        )
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown policy status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PolicyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PolicyStatus::Active),
            "canceled" => Ok(PolicyStatus::Canceled),
            "claim_approved" => Ok(PolicyStatus::ClaimApproved),
            "expired" => Ok(PolicyStatus::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The amounts agreed at purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAmounts {
    /// Paid into the pool at purchase, refundable on cancellation
    pub deposit: Lamports,
    /// Price of coverage, not refundable
    pub premium: Lamports,
    /// Maximum payout on an approved claim
    pub coverage: Lamports,
}

impl PolicyAmounts {
    pub fn new(deposit: u64, premium: u64, coverage: u64) -> Self {
        Self {
            deposit: Lamports::new(deposit),
            premium: Lamports::new(premium),
            coverage: Lamports::new(coverage),
        }
    }

    /// Validates the purchase amounts
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidAmount` if the deposit or premium is zero,
    /// or the coverage is smaller than the premium
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.deposit.is_zero() {
            return Err(PolicyError::invalid_amount("deposit must be greater than zero"));
        }
        if self.premium.is_zero() {
            return Err(PolicyError::invalid_amount("premium must be greater than zero"));
        }
        validate_coverage(self.coverage, self.premium)
    }
}

fn validate_coverage(coverage: Lamports, premium: Lamports) -> Result<(), PolicyError> {
    if coverage.is_zero() || coverage < premium {
        return Err(PolicyError::invalid_amount(format!(
            "coverage {} must be at least the premium {}",
            coverage.get(),
            premium.get()
        )));
    }
    Ok(())
}

/// Plain field view of a policy, used by storage adapters to rebuild records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyParts {
    pub id: PolicyId,
    pub pool: PoolId,
    pub user: Identity,
    pub amounts: PolicyAmounts,
    pub term: CoverageTerm,
    pub status: PolicyStatus,
    pub refunded_amount: Lamports,
    pub paid_out_amount: Lamports,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased insurance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    id: PolicyId,
    /// Pool the policy was purchased from
    pool: PoolId,
    /// Holder; the only identity allowed to cancel or adjust
    user: Identity,
    amounts: PolicyAmounts,
    term: CoverageTerm,
    status: PolicyStatus,
    refunded_amount: Lamports,
    paid_out_amount: Lamports,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Events raised since the last `take_events`
    #[serde(skip)]
    events: Vec<PolicyEvent>,
}

impl InsurancePolicy {
    /// Creates an active policy
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier of the new policy slot
    /// * `pool` - Pool the coverage is bought from
    /// * `user` - The purchasing identity
    /// * `amounts` - Deposit, premium and coverage
    /// * `term` - Coverage term
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidAmount` if the amounts fail validation
    pub fn purchase(
        id: PolicyId,
        pool: PoolId,
        user: Identity,
        amounts: PolicyAmounts,
        term: CoverageTerm,
    ) -> Result<Self, PolicyError> {
        amounts.validate()?;
        let now = term.start;

        let mut policy = Self {
            id,
            pool,
            user,
            amounts,
            term,
            status: PolicyStatus::Active,
            refunded_amount: Lamports::ZERO,
            paid_out_amount: Lamports::ZERO,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        policy.events.push(PolicyEvent::Purchased {
            policy_id: id,
            user,
            amounts,
            timestamp: now,
        });
        Ok(policy)
    }

    /// Rebuilds a policy from stored fields
    pub fn restore(parts: PolicyParts) -> Self {
        Self {
            id: parts.id,
            pool: parts.pool,
            user: parts.user,
            amounts: parts.amounts,
            term: parts.term,
            status: parts.status,
            refunded_amount: parts.refunded_amount,
            paid_out_amount: parts.paid_out_amount,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            events: Vec::new(),
        }
    }

    pub fn to_parts(&self) -> PolicyParts {
        PolicyParts {
            id: self.id,
            pool: self.pool,
            user: self.user,
            amounts: self.amounts,
            term: self.term,
            status: self.status,
            refunded_amount: self.refunded_amount,
            paid_out_amount: self.paid_out_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> PolicyId {
        self.id
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn user(&self) -> Identity {
        self.user
    }

    pub fn is_owned_by(&self, caller: &Identity) -> bool {
        &self.user == caller
    }

    pub fn amounts(&self) -> PolicyAmounts {
        self.amounts
    }

    pub fn deposit_amount(&self) -> Lamports {
        self.amounts.deposit
    }

    pub fn premium_amount(&self) -> Lamports {
        self.amounts.premium
    }

    pub fn coverage_amount(&self) -> Lamports {
        self.amounts.coverage
    }

    pub fn term(&self) -> CoverageTerm {
        self.term
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.term.start
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.term.end
    }

    pub fn status(&self) -> PolicyStatus {
        self.status
    }

    /// True while coverage is in force
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// True once a claim has been approved and paid
    pub fn claim_approved(&self) -> bool {
        self.status == PolicyStatus::ClaimApproved
    }

    pub fn refunded_amount(&self) -> Lamports {
        self.refunded_amount
    }

    pub fn paid_out_amount(&self) -> Lamports {
        self.paid_out_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<PolicyEvent> {
        std::mem::take(&mut self.events)
    }

    /// Cancels the policy at the holder's request
    ///
    /// The caller decides the refund; the policy only records it.
    ///
    /// # Errors
    ///
    /// - `PolicyError::NotActive` if the policy already left the active state
    /// - `PolicyError::Expired` if the coverage term is over
    pub fn cancel(&mut self, refund: Lamports, now: DateTime<Utc>) -> Result<(), PolicyError> {
        self.ensure_active()?;
        if self.term.has_ended(now) {
            return Err(PolicyError::Expired { end_time: self.term.end });
        }
        if refund > self.amounts.deposit {
            return Err(PolicyError::invalid_amount("refund exceeds the deposit"));
        }

        self.transition(PolicyStatus::Canceled, now)?;
        self.refunded_amount = refund;
        self.events.push(PolicyEvent::Canceled {
            policy_id: self.id,
            refund,
            timestamp: now,
        });
        Ok(())
    }

    /// Marks the claim on this policy as approved
    ///
    /// # Returns
    ///
    /// The payout owed to the holder (the full coverage amount)
    ///
    /// # Errors
    ///
    /// - `PolicyError::ClaimAlreadyApproved` on a second approval
    /// - `PolicyError::NotActive` if the policy was canceled or expired
    pub fn approve_claim(&mut self, now: DateTime<Utc>) -> Result<Lamports, PolicyError> {
        if self.claim_approved() {
            return Err(PolicyError::ClaimAlreadyApproved);
        }
        self.ensure_active()?;

        let payout = self.amounts.coverage;
        self.transition(PolicyStatus::ClaimApproved, now)?;
        self.paid_out_amount = payout;
        self.events.push(PolicyEvent::ClaimApproved {
            policy_id: self.id,
            payout,
            timestamp: now,
        });
        Ok(payout)
    }

    /// Closes a policy whose term has ended
    ///
    /// # Errors
    ///
    /// - `PolicyError::NotActive` if the policy already left the active state
    /// - `PolicyError::NotYetExpired` if the term is still running
    pub fn expire(&mut self, refund: Lamports, now: DateTime<Utc>) -> Result<(), PolicyError> {
        self.ensure_active()?;
        if !self.term.has_ended(now) {
            return Err(PolicyError::NotYetExpired { end_time: self.term.end });
        }
        if refund > self.amounts.deposit {
            return Err(PolicyError::invalid_amount("refund exceeds the deposit"));
        }

        self.transition(PolicyStatus::Expired, now)?;
        self.refunded_amount = refund;
        self.events.push(PolicyEvent::Expired {
            policy_id: self.id,
            refund,
            timestamp: now,
        });
        Ok(())
    }

    /// Changes the coverage limit of an active policy
    ///
    /// # Returns
    ///
    /// The previous coverage amount
    ///
    /// # Errors
    ///
    /// - `PolicyError::NotActive` / `PolicyError::Expired` as for `cancel`
    /// - `PolicyError::InvalidAmount` if the new coverage is below the premium
    pub fn adjust_coverage(
        &mut self,
        new_coverage: Lamports,
        now: DateTime<Utc>,
    ) -> Result<Lamports, PolicyError> {
        self.ensure_active()?;
        if self.term.has_ended(now) {
            return Err(PolicyError::Expired { end_time: self.term.end });
        }
        validate_coverage(new_coverage, self.amounts.premium)?;

        let previous = self.amounts.coverage;
        self.amounts.coverage = new_coverage;
        self.updated_at = now;
        self.events.push(PolicyEvent::CoverageAdjusted {
            policy_id: self.id,
            previous,
            current: new_coverage,
            timestamp: now,
        });
        Ok(previous)
    }

    fn ensure_active(&self) -> Result<(), PolicyError> {
        if !self.is_active() {
            return Err(PolicyError::NotActive { status: self.status });
        }
        Ok(())
    }

    fn transition(&mut self, to: PolicyStatus, now: DateTime<Utc>) -> Result<(), PolicyError> {
        if !self.status.can_transition_to(to) {
            return Err(PolicyError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
