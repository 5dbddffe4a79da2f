//! Port adapters backed by PostgreSQL

pub mod protocol;

pub use protocol::PostgresProtocolStore;
