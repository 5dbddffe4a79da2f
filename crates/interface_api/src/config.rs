//! Service configuration
//!
//! Read from `INSURANCE__*` environment variables, with `__` separating
//! nested keys:
//!
//! | variable                                  | default                          |
//! |-------------------------------------------|----------------------------------|
//! | `INSURANCE__LOG__LEVEL`                   | `info`                           |
//! | `INSURANCE__LOG__FORMAT`                  | `pretty` (`json`)                |
//! | `INSURANCE__STORE`                        | `memory` (`postgres`)            |
//! | `INSURANCE__DATABASE__URL`                | `postgres://localhost/insurance` |
//! | `INSURANCE__DATABASE__MAX_CONNECTIONS`    | `10`                             |
//! | `INSURANCE__AUTH__JWT_SECRET`             | none, at least 32 bytes          |
//! | `INSURANCE__AUTH__JWT_EXPIRATION_SECS`    | `3600`                           |
//! | `INSURANCE__PROTOCOL__REFUND_POLICY`      | `full_deposit` (`pro_rata`)      |
//! | `INSURANCE__PROTOCOL__PURCHASE_SOLVENCY`  | `deferred` (`strict`)            |
//! | `INSURANCE__PROTOCOL__COVERAGE_TERM_DAYS` | `30`                             |

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use core_kernel::CoreError;
use domain_protocol::ProtocolConfig;
use infra_db::DatabaseConfig;

const ENV_PREFIX: &str = "INSURANCE";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Invalid protocol configuration: {0}")]
    Protocol(#[from] CoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Where protocol records live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process memory; records are lost on exit
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    #[validate(range(min = 1))]
    pub max_connections: u32,
    pub min_connections: u32,
    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/insurance".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseSettings {
    pub fn to_pool_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct AuthSettings {
    /// HS256 signing secret
    #[validate(length(min = 32))]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_secs")]
    #[validate(range(min = 1))]
    pub jwt_expiration_secs: u64,
}

fn default_jwt_expiration_secs() -> u64 {
    3600
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct ApiConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[validate(nested)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl ApiConfig {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed, the JWT secret is
    /// missing or short, or the protocol settings are out of range
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Self::environment())
    }

    /// Loads configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_environment(Self::environment().source(Some(vars)))
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
    }

    fn from_environment(environment: config::Environment) -> Result<Self, ConfigError> {
        let loaded: ApiConfig = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        loaded.protocol.validate()?;
        Ok(loaded)
    }
}
