//! PostgreSQL Protocol Store
//!
//! Implements the `ProtocolStore` port with one SQLx transaction per
//! protocol call.
//!
//! # Locking
//!
//! `pool_for_update` and `policy_for_update` read with `FOR UPDATE`, so the
//! rows stay locked until the transaction commits or rolls back. The state
//! machine always locks the pool before the policy, which keeps lock order
//! consistent across calls. Dropping a [`PgStoreTransaction`] without
//! committing rolls it back.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use tracing::{debug, instrument};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PolicyId, PoolId, PortError,
};
use domain_policy::{InsurancePolicy, PolicyHistoryEntry};
use domain_pool::InsurancePool;
use domain_protocol::{ProtocolStore, StoreTransaction};

use crate::error::DatabaseError;
use crate::rows::{to_numeric, HistoryRow, PolicyRow, PoolRow};

const POOL_COLUMNS: &str = "id, authority, bump, total_balance, outstanding_coverage, \
    active_policies, total_deposits, total_premiums, total_refunds, total_claims_paid, \
    total_contributions, total_withdrawals, created_at, updated_at";

const POLICY_COLUMNS: &str = "id, pool_id, user_id, deposit_amount, premium_amount, \
    coverage_amount, start_time, end_time, status, refunded_amount, paid_out_amount, \
    created_at, updated_at";

/// PostgreSQL-backed implementation of [`ProtocolStore`]
#[derive(Debug, Clone)]
pub struct PostgresProtocolStore {
    pool: PgPool,
}

impl PostgresProtocolStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresProtocolStore {}

#[async_trait]
impl HealthCheckable for PostgresProtocolStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-protocol-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy(
                "postgres-protocol-store",
                latency_ms,
                format!("Database health check failed: {}", e),
            ),
        }
    }
}

#[async_trait]
impl ProtocolStore for PostgresProtocolStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, PortError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

/// An open protocol transaction
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    #[instrument(skip(self), fields(pool = %id))]
    async fn pool_for_update(&mut self, id: PoolId) -> Result<Option<InsurancePool>, PortError> {
        let sql = format!("SELECT {} FROM insurance_pools WHERE id = $1 FOR UPDATE", POOL_COLUMNS);
        let row = sqlx::query_as::<_, PoolRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;

        row.map(InsurancePool::try_from)
            .transpose()
            .map_err(PortError::from)
    }

    #[instrument(skip(self), fields(policy = %id))]
    async fn policy_for_update(
        &mut self,
        id: PolicyId,
    ) -> Result<Option<InsurancePolicy>, PortError> {
        let sql = format!(
            "SELECT {} FROM insurance_policies WHERE id = $1 FOR UPDATE",
            POLICY_COLUMNS
        );
        let row = sqlx::query_as::<_, PolicyRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;

        row.map(InsurancePolicy::try_from)
            .transpose()
            .map_err(PortError::from)
    }

    async fn insert_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO insurance_pools ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            POOL_COLUMNS
        );
        bind_pool(sqlx::query(&sql), pool)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        debug!(pool = %pool.id, "Pool row inserted");
        Ok(())
    }

    async fn update_pool(&mut self, pool: &InsurancePool) -> Result<(), PortError> {
        let result = bind_pool(
            sqlx::query(
                "UPDATE insurance_pools SET \
                 authority = $2, bump = $3, total_balance = $4, outstanding_coverage = $5, \
                 active_policies = $6, total_deposits = $7, total_premiums = $8, \
                 total_refunds = $9, total_claims_paid = $10, total_contributions = $11, \
                 total_withdrawals = $12, created_at = $13, updated_at = $14 \
                 WHERE id = $1",
            ),
            pool,
        )
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("InsurancePool", pool.id));
        }
        Ok(())
    }

    async fn insert_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO insurance_policies ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            POLICY_COLUMNS
        );
        bind_policy(sqlx::query(&sql), policy)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        debug!(policy = %policy.id(), "Policy row inserted");
        Ok(())
    }

    async fn update_policy(&mut self, policy: &InsurancePolicy) -> Result<(), PortError> {
        let result = bind_policy(
            sqlx::query(
                "UPDATE insurance_policies SET \
                 pool_id = $2, user_id = $3, deposit_amount = $4, premium_amount = $5, \
                 coverage_amount = $6, start_time = $7, end_time = $8, status = $9, \
                 refunded_amount = $10, paid_out_amount = $11, created_at = $12, \
                 updated_at = $13 \
                 WHERE id = $1",
            ),
            policy,
        )
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("InsurancePolicy", policy.id()));
        }
        Ok(())
    }

    async fn append_history(&mut self, entry: &PolicyHistoryEntry) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO policy_history \
             (id, policy_id, pool_id, actor, action, amount, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*entry.id.as_uuid())
        .bind(*entry.policy.as_uuid())
        .bind(*entry.pool.as_uuid())
        .bind(*entry.actor.as_uuid())
        .bind(entry.action.as_str())
        .bind(to_numeric(entry.amount))
        .bind(entry.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn history(&mut self, policy: PolicyId) -> Result<Vec<PolicyHistoryEntry>, PortError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, policy_id, pool_id, actor, action, amount, recorded_at \
             FROM policy_history WHERE policy_id = $1 ORDER BY seq",
        )
        .bind(*policy.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| PolicyHistoryEntry::try_from(row).map_err(PortError::from))
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(db_error)
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn bind_pool<'q>(query: PgQuery<'q>, pool: &InsurancePool) -> PgQuery<'q> {
    query
        .bind(*pool.id.as_uuid())
        .bind(*pool.authority.as_uuid())
        .bind(i16::from(pool.bump))
        .bind(to_numeric(pool.total_balance))
        .bind(to_numeric(pool.outstanding_coverage))
        .bind(i64::try_from(pool.active_policies).unwrap_or(i64::MAX))
        .bind(to_numeric(pool.totals.deposits))
        .bind(to_numeric(pool.totals.premiums))
        .bind(to_numeric(pool.totals.refunds))
        .bind(to_numeric(pool.totals.claims_paid))
        .bind(to_numeric(pool.totals.contributions))
        .bind(to_numeric(pool.totals.withdrawals))
        .bind(pool.created_at)
        .bind(pool.updated_at)
}

fn bind_policy<'q>(query: PgQuery<'q>, policy: &InsurancePolicy) -> PgQuery<'q> {
    query
        .bind(*policy.id().as_uuid())
        .bind(*policy.pool().as_uuid())
        .bind(*policy.user().as_uuid())
        .bind(to_numeric(policy.deposit_amount()))
        .bind(to_numeric(policy.premium_amount()))
        .bind(to_numeric(policy.coverage_amount()))
        .bind(policy.start_time())
        .bind(policy.end_time())
        .bind(policy.status().as_str())
        .bind(to_numeric(policy.refunded_amount()))
        .bind(to_numeric(policy.paid_out_amount()))
        .bind(policy.created_at())
        .bind(policy.updated_at())
}

fn db_error(error: sqlx::Error) -> PortError {
    DatabaseError::from(error).into()
}
