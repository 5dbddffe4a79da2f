//! Schema migrations

use sqlx::PgPool;
use tracing::info;

use crate::error::DatabaseError;

/// Initial protocol schema
pub const PROTOCOL_SCHEMA: &str =
    include_str!("../migrations/20240101_000001_protocol_schema.sql");

/// Applies the protocol schema
///
/// Every statement is idempotent, so this is safe to run on each start.
///
/// # Errors
///
/// Returns `DatabaseError::MigrationFailed` if a statement fails
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(PROTOCOL_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
    info!("Protocol schema applied");
    Ok(())
}
