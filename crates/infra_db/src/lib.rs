//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the insurance protocol using SQLx.
//!
//! # Architecture
//!
//! [`PostgresProtocolStore`] implements the `ProtocolStore` port from
//! `domain_protocol`. Each protocol call runs in one database transaction;
//! records read for update are locked with `SELECT ... FOR UPDATE`, so
//! concurrent calls on the same pool or policy are serialized by PostgreSQL.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresProtocolStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/insurance")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresProtocolStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod rows;
pub mod schema;

pub use adapters::PostgresProtocolStore;
pub use error::DatabaseError;
pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use schema::run_migrations;
