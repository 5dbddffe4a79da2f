//! Row types and their mapping onto domain records
//!
//! Amounts are stored as `NUMERIC(20, 0)` and read back through
//! [`rust_decimal::Decimal`]; a stored value that is negative, fractional or
//! above `u64::MAX` is reported as a corrupt row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use core_kernel::{CoverageTerm, Lamports};
use domain_policy::{
    InsurancePolicy, PolicyAction, PolicyAmounts, PolicyHistoryEntry, PolicyParts, PolicyStatus,
};
use domain_pool::{InsurancePool, PoolTotals};

use crate::error::DatabaseError;

pub fn to_numeric(amount: Lamports) -> Decimal {
    Decimal::from(amount.get())
}

/// Reads a stored amount back into lamports
pub fn to_lamports(column: &str, value: Decimal) -> Result<Lamports, DatabaseError> {
    if !value.fract().is_zero() {
        return Err(DatabaseError::corrupt(column, format!("fractional amount {}", value)));
    }
    u64::try_from(value)
        .map(Lamports::new)
        .map_err(|_| DatabaseError::corrupt(column, format!("amount {} out of range", value)))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoolRow {
    pub id: Uuid,
    pub authority: Uuid,
    pub bump: i16,
    pub total_balance: Decimal,
    pub outstanding_coverage: Decimal,
    pub active_policies: i64,
    pub total_deposits: Decimal,
    pub total_premiums: Decimal,
    pub total_refunds: Decimal,
    pub total_claims_paid: Decimal,
    pub total_contributions: Decimal,
    pub total_withdrawals: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PoolRow> for InsurancePool {
    type Error = DatabaseError;

    fn try_from(row: PoolRow) -> Result<Self, Self::Error> {
        Ok(InsurancePool {
            id: row.id.into(),
            authority: row.authority.into(),
            total_balance: to_lamports("total_balance", row.total_balance)?,
            bump: u8::try_from(row.bump).map_err(|e| DatabaseError::corrupt("bump", e))?,
            totals: PoolTotals {
                deposits: to_lamports("total_deposits", row.total_deposits)?,
                premiums: to_lamports("total_premiums", row.total_premiums)?,
                refunds: to_lamports("total_refunds", row.total_refunds)?,
                claims_paid: to_lamports("total_claims_paid", row.total_claims_paid)?,
                contributions: to_lamports("total_contributions", row.total_contributions)?,
                withdrawals: to_lamports("total_withdrawals", row.total_withdrawals)?,
            },
            outstanding_coverage: to_lamports("outstanding_coverage", row.outstanding_coverage)?,
            active_policies: u64::try_from(row.active_policies)
                .map_err(|e| DatabaseError::corrupt("active_policies", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PolicyRow {
    pub id: Uuid,
    pub pool_id: Uuid,
    pub user_id: Uuid,
    pub deposit_amount: Decimal,
    pub premium_amount: Decimal,
    pub coverage_amount: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub refunded_amount: Decimal,
    pub paid_out_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PolicyRow> for InsurancePolicy {
    type Error = DatabaseError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        let status: PolicyStatus = row
            .status
            .parse()
            .map_err(|e| DatabaseError::corrupt("status", e))?;
        let term = CoverageTerm::bounded(row.start_time, row.end_time)
            .map_err(|e| DatabaseError::corrupt("end_time", e))?;

        Ok(InsurancePolicy::restore(PolicyParts {
            id: row.id.into(),
            pool: row.pool_id.into(),
            user: row.user_id.into(),
            amounts: PolicyAmounts {
                deposit: to_lamports("deposit_amount", row.deposit_amount)?,
                premium: to_lamports("premium_amount", row.premium_amount)?,
                coverage: to_lamports("coverage_amount", row.coverage_amount)?,
            },
            term,
            status,
            refunded_amount: to_lamports("refunded_amount", row.refunded_amount)?,
            paid_out_amount: to_lamports("paid_out_amount", row.paid_out_amount)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub pool_id: Uuid,
    pub actor: Uuid,
    pub action: String,
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for PolicyHistoryEntry {
    type Error = DatabaseError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let action: PolicyAction = row
            .action
            .parse()
            .map_err(|e| DatabaseError::corrupt("action", e))?;

        Ok(PolicyHistoryEntry {
            id: row.id.into(),
            policy: row.policy_id.into(),
            pool: row.pool_id.into(),
            actor: row.actor.into(),
            action,
            amount: to_lamports("amount", row.amount)?,
            recorded_at: row.recorded_at,
        })
    }
}
