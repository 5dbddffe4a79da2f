//! Protocol Service Layer
//!
//! The caller-facing side of the insurance protocol.
//!
//! - **Auth**: HS256 bearer tokens carrying the caller identity
//! - **Config**: `INSURANCE__*` environment configuration
//! - **DTOs**: Request and response shapes with SOL conversions
//! - **Errors**: Stable error codes for clients
//! - **Telemetry**: Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{config::ApiConfig, ProtocolService};
//!
//! let config = ApiConfig::from_env()?;
//! let service = ProtocolService::from_config(&config).await?;
//! let receipt = service.submit(&token, request).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod service;
pub mod telemetry;

pub use auth::{AuthError, TokenAuthority};
pub use error::{ApiError, ErrorResponse};
pub use service::ProtocolService;
