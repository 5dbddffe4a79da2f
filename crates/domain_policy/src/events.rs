//! Domain events for insurance policies
//!
//! Each lifecycle transition of an [`InsurancePolicy`](crate::InsurancePolicy)
//! raises one event. The protocol drains them with `take_events` and writes
//! them to the policy history in the same transaction as the state change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Identity, Lamports, PolicyId};

use crate::history::PolicyAction;
use crate::policy::PolicyAmounts;

/// Domain events emitted by a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEvent {
    /// Policy was purchased
    Purchased {
        policy_id: PolicyId,
        user: Identity,
        amounts: PolicyAmounts,
        timestamp: DateTime<Utc>,
    },

    /// Policy was canceled by its holder
    Canceled {
        policy_id: PolicyId,
        refund: Lamports,
        timestamp: DateTime<Utc>,
    },

    /// A claim was approved and the coverage paid
    ClaimApproved {
        policy_id: PolicyId,
        payout: Lamports,
        timestamp: DateTime<Utc>,
    },

    /// The coverage term ended
    Expired {
        policy_id: PolicyId,
        refund: Lamports,
        timestamp: DateTime<Utc>,
    },

    /// The coverage limit changed
    CoverageAdjusted {
        policy_id: PolicyId,
        previous: Lamports,
        current: Lamports,
        timestamp: DateTime<Utc>,
    },
}

impl PolicyEvent {
    pub fn policy_id(&self) -> PolicyId {
        match self {
            PolicyEvent::Purchased { policy_id, .. }
            | PolicyEvent::Canceled { policy_id, .. }
            | PolicyEvent::ClaimApproved { policy_id, .. }
            | PolicyEvent::Expired { policy_id, .. }
            | PolicyEvent::CoverageAdjusted { policy_id, .. } => *policy_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PolicyEvent::Purchased { timestamp, .. }
            | PolicyEvent::Canceled { timestamp, .. }
            | PolicyEvent::ClaimApproved { timestamp, .. }
            | PolicyEvent::Expired { timestamp, .. }
            | PolicyEvent::CoverageAdjusted { timestamp, .. } => *timestamp,
        }
    }

    pub fn action(&self) -> PolicyAction {
        match self {
            PolicyEvent::Purchased { .. } => PolicyAction::Created,
            PolicyEvent::Canceled { .. } => PolicyAction::Canceled,
            PolicyEvent::ClaimApproved { .. } => PolicyAction::ClaimApproved,
            PolicyEvent::Expired { .. } => PolicyAction::Expired,
            PolicyEvent::CoverageAdjusted { .. } => PolicyAction::CoverageAdjusted,
        }
    }

    /// The amount that moved with this event
    ///
    /// Deposit for a purchase, refund for a cancellation or expiry, payout for
    /// an approval, and the new limit for a coverage adjustment.
    pub fn amount(&self) -> Lamports {
        match self {
            PolicyEvent::Purchased { amounts, .. } => amounts.deposit,
            PolicyEvent::Canceled { refund, .. } | PolicyEvent::Expired { refund, .. } => *refund,
            PolicyEvent::ClaimApproved { payout, .. } => *payout,
            PolicyEvent::CoverageAdjusted { current, .. } => *current,
        }
    }
}
