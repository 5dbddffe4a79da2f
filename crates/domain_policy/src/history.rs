//! Policy action history
//!
//! An append-only log of what happened to each policy, who did it, and how
//! much moved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{HistoryEntryId, Identity, Lamports, PolicyId, PoolId};

use crate::events::PolicyEvent;
use crate::policy::UnknownStatus;

/// Kind of action recorded in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Created,
    Canceled,
    ClaimApproved,
    Expired,
    CoverageAdjusted,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Created => "created",
            PolicyAction::Canceled => "canceled",
            PolicyAction::ClaimApproved => "claim_approved",
            PolicyAction::Expired => "expired",
            PolicyAction::CoverageAdjusted => "coverage_adjusted",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyAction {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PolicyAction::Created),
            "canceled" => Ok(PolicyAction::Canceled),
            "claim_approved" => Ok(PolicyAction::ClaimApproved),
            "expired" => Ok(PolicyAction::Expired),
            "coverage_adjusted" => Ok(PolicyAction::CoverageAdjusted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One entry in a policy's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyHistoryEntry {
    pub id: HistoryEntryId,
    pub policy: PolicyId,
    pub pool: PoolId,
    /// Identity that signed the operation
    pub actor: Identity,
    pub action: PolicyAction,
    pub amount: Lamports,
    pub recorded_at: DateTime<Utc>,
}

impl PolicyHistoryEntry {
    /// Builds the history entry for a policy event
    pub fn from_event(event: &PolicyEvent, pool: PoolId, actor: Identity) -> Self {
        Self {
            id: HistoryEntryId::new_v7(),
            policy: event.policy_id(),
            pool,
            actor,
            action: event.action(),
            amount: event.amount(),
            recorded_at: event.timestamp(),
        }
    }
}
