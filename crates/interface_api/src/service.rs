//! Protocol service
//!
//! The caller-facing entry point: authenticates the bearer token, binds the
//! verified identity as signer, and runs the instruction against the
//! protocol.

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{HealthCheckResult, PolicyId, PoolId};
use domain_protocol::{InMemoryProtocolStore, InsuranceProtocol, ProtocolStore};
use infra_db::{create_pool, run_migrations, PostgresProtocolStore};

use crate::auth::TokenAuthority;
use crate::config::{ApiConfig, StoreBackend};
use crate::dto::{
    InstructionRequest, PolicyStatusView, PolicyView, PoolStatusView, ReceiptView,
};
use crate::error::ApiError;

/// Authenticated access to one protocol instance
#[derive(Debug, Clone)]
pub struct ProtocolService {
    protocol: Arc<InsuranceProtocol>,
    tokens: TokenAuthority,
}

impl ProtocolService {
    pub fn new(protocol: Arc<InsuranceProtocol>, tokens: TokenAuthority) -> Self {
        Self { protocol, tokens }
    }

    /// Builds the service and its store from configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` if the Postgres backend is selected and
    /// the database cannot be reached or migrated
    pub async fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn ProtocolStore> = match config.store {
            StoreBackend::Memory => Arc::new(InMemoryProtocolStore::new()),
            StoreBackend::Postgres => {
                let pool = create_pool(config.database.to_pool_config()).await?;
                run_migrations(&pool).await?;
                Arc::new(PostgresProtocolStore::new(pool))
            }
        };
        info!(store = ?config.store, protocol = ?config.protocol, "Protocol service ready");

        let protocol = InsuranceProtocol::new(store, config.protocol.clone());
        let tokens = TokenAuthority::new(&config.auth.jwt_secret, config.auth.jwt_expiration_secs);
        Ok(Self::new(Arc::new(protocol), tokens))
    }

    pub fn protocol(&self) -> &Arc<InsuranceProtocol> {
        &self.protocol
    }

    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Authenticates the caller and executes one instruction
    ///
    /// # Errors
    ///
    /// - `ApiError::Auth` if the token does not verify
    /// - `ApiError::Protocol` if the protocol rejects the call
    #[instrument(skip_all, fields(instruction = request.instruction.name(), pool = %request.pool))]
    pub async fn submit(
        &self,
        bearer: &str,
        request: InstructionRequest,
    ) -> Result<ReceiptView, ApiError> {
        let signer = self.tokens.verify(bearer)?;
        info!(%signer, policy = ?request.policy, "Submitting instruction");
        let receipt = self
            .protocol
            .execute(request.instruction, request.bindings(signer))
            .await?;
        Ok(ReceiptView::new(&request.instruction, signer, &receipt))
    }

    /// Parses a JSON-encoded [`InstructionRequest`] and submits it
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for a malformed body, otherwise as
    /// [`ProtocolService::submit`]
    pub async fn submit_json(&self, bearer: &str, body: &str) -> Result<ReceiptView, ApiError> {
        let request: InstructionRequest =
            serde_json::from_str(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        self.submit(bearer, request).await
    }

    /// Reads a pool and audits its balance
    pub async fn pool_status(&self, pool: PoolId) -> Result<PoolStatusView, ApiError> {
        let audit = self.protocol.audit_pool(pool).await?;
        Ok(PoolStatusView::new(&audit))
    }

    /// Reads a policy and its history
    pub async fn policy_status(&self, policy: PolicyId) -> Result<PolicyStatusView, ApiError> {
        let record = self.protocol.policy(policy).await?;
        let history = self.protocol.policy_history(policy).await?;
        Ok(PolicyStatusView {
            policy: PolicyView::from(&record),
            history,
        })
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.protocol.store().health_check().await
    }
}
