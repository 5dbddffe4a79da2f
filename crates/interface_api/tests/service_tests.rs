//! Service tests: token-authenticated calls against an in-memory protocol

use core_kernel::{AdapterHealth, Identity, Lamports, PolicyId};
use domain_policy::{PolicyAction, PolicyStatus};
use domain_protocol::{ErrorKind, Instruction, TransferKind};
use interface_api::dto::{InstructionRequest, PoolView};
use interface_api::{ApiError, AuthError, ProtocolService, TokenAuthority};
use rust_decimal_macros::dec;
use test_utils::{IdentityFixtures, TestProtocol, TestProtocolBuilder};

const SECRET: &str = "service-test-secret-0123456789abcdef";

async fn setup() -> (TestProtocol, ProtocolService) {
    let harness = TestProtocolBuilder::new().build().await;
    let service = ProtocolService::new(
        harness.protocol.clone(),
        TokenAuthority::new(SECRET, 3600),
    );
    (harness, service)
}

fn token(service: &ProtocolService, identity: Identity) -> String {
    format!("Bearer {}", service.tokens().issue(identity).unwrap())
}

fn standard_purchase() -> Instruction {
    Instruction::PurchaseInsurance {
        deposit_amount: Lamports::new(1000),
        premium_amount: Lamports::new(100),
        coverage_amount: Lamports::new(5000),
    }
}

fn protocol_kind(err: &ApiError) -> ErrorKind {
    match err {
        ApiError::Protocol(e) => e.kind(),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

// ============================================================================
// Submission
// ============================================================================

mod submit_tests {
    use super::*;

    #[tokio::test]
    async fn test_purchase_binds_token_identity_as_holder() {
        let (harness, service) = setup().await;
        let user = IdentityFixtures::user();
        let policy = PolicyId::new_v7();

        let receipt = service
            .submit(
                &token(&service, user),
                InstructionRequest::new(harness.pool_id, standard_purchase()).with_policy(policy),
            )
            .await
            .unwrap();

        assert_eq!(receipt.instruction, "purchase_insurance");
        assert_eq!(receipt.signer, user);
        let view = receipt.policy.unwrap();
        assert_eq!(view.id, policy);
        assert_eq!(view.user, user);
        assert_eq!(view.status, PolicyStatus::Active);
        assert_eq!(receipt.pool.balance.lamports, 1000);
        assert!(receipt.transfer.is_none());
    }

    #[tokio::test]
    async fn test_cancel_returns_refund_transfer() {
        let (harness, service) = setup().await;
        let user = IdentityFixtures::user();
        let policy = harness.purchase_standard().await;

        let receipt = service
            .submit(
                &token(&service, user),
                InstructionRequest::new(harness.pool_id, Instruction::CancelPolicy)
                    .with_policy(policy),
            )
            .await
            .unwrap();

        let transfer = receipt.transfer.unwrap();
        assert_eq!(transfer.recipient, user);
        assert_eq!(transfer.kind, TransferKind::Refund);
        assert_eq!(transfer.amount.lamports, 1000);
        assert_eq!(receipt.pool.balance.lamports, 0);
        assert_eq!(receipt.policy.unwrap().status, PolicyStatus::Canceled);
    }

    #[tokio::test]
    async fn test_underfunded_claim_is_retryable() {
        let (harness, service) = setup().await;
        let policy = harness.purchase_standard().await;

        let err = service
            .submit(
                &token(&service, harness.authority),
                InstructionRequest::new(harness.pool_id, Instruction::ApproveClaim)
                    .with_policy(policy),
            )
            .await
            .unwrap_err();

        assert_eq!(protocol_kind(&err), ErrorKind::InsufficientFunds);
        let response = err.to_response();
        assert_eq!(response.code, "insufficient_funds");
        assert!(response.retryable);
        assert!(harness.policy(policy).await.is_active());
    }

    #[tokio::test]
    async fn test_funded_claim_pays_holder() {
        let harness = TestProtocolBuilder::new().with_seed_capital(10_000).build().await;
        let service = ProtocolService::new(harness.protocol.clone(), TokenAuthority::new(SECRET, 60));
        let policy = harness.purchase_standard().await;

        let receipt = service
            .submit(
                &token(&service, harness.authority),
                InstructionRequest::new(harness.pool_id, Instruction::ApproveClaim)
                    .with_policy(policy),
            )
            .await
            .unwrap();

        let transfer = receipt.transfer.unwrap();
        assert_eq!(transfer.recipient, IdentityFixtures::user());
        assert_eq!(transfer.kind, TransferKind::ClaimPayout);
        assert_eq!(transfer.amount.lamports, 5000);
        assert_eq!(receipt.pool.balance.lamports, 6000);
    }

    #[tokio::test]
    async fn test_non_authority_cannot_approve() {
        let (harness, service) = setup().await;
        let policy = harness.purchase_standard().await;

        let err = service
            .submit(
                &token(&service, IdentityFixtures::user()),
                InstructionRequest::new(harness.pool_id, Instruction::ApproveClaim)
                    .with_policy(policy),
            )
            .await
            .unwrap_err();

        assert_eq!(protocol_kind(&err), ErrorKind::Unauthorized);
        assert_eq!(err.to_response().code, "unauthorized");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_policy_binding_is_policy_not_found() {
        let (harness, service) = setup().await;

        let err = service
            .submit(
                &token(&service, IdentityFixtures::user()),
                InstructionRequest::new(harness.pool_id, Instruction::CancelPolicy),
            )
            .await
            .unwrap_err();

        assert_eq!(protocol_kind(&err), ErrorKind::PolicyNotFound);
    }

    #[tokio::test]
    async fn test_submit_json_parses_request() {
        let (harness, service) = setup().await;
        let body = format!(
            r#"{{"pool":"{}","instruction":{{"instruction":"contribute_capital","amount":2500}}}}"#,
            harness.pool_id.as_uuid()
        );

        let receipt = service
            .submit_json(&token(&service, harness.authority), &body)
            .await
            .unwrap();

        assert_eq!(receipt.instruction, "contribute_capital");
        assert_eq!(receipt.pool.balance.lamports, 2500);
    }

    #[tokio::test]
    async fn test_submit_json_rejects_malformed_body() {
        let (_harness, service) = setup().await;

        let err = service
            .submit_json(&token(&service, IdentityFixtures::user()), "{not json")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.to_response().code, "bad_request");
    }
}

// ============================================================================
// Authentication
// ============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let (harness, service) = setup().await;

        let err = service
            .submit("", InstructionRequest::new(harness.pool_id, standard_purchase()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Auth(AuthError::MissingToken)));
        assert_eq!(err.to_response().code, "unauthenticated");
    }

    #[tokio::test]
    async fn test_foreign_token_changes_nothing() {
        let (harness, service) = setup().await;
        let foreign = TokenAuthority::new("another-secret-another-secret-0000", 3600)
            .issue(IdentityFixtures::user())
            .unwrap();

        let err = service
            .submit(&foreign, InstructionRequest::new(harness.pool_id, standard_purchase()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Auth(AuthError::InvalidToken)));
        assert_eq!(harness.balance().await, Lamports::ZERO);
        assert_eq!(harness.store.history_len().await, 0);
    }
}

// ============================================================================
// Status queries
// ============================================================================

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_status_reports_audit() {
        let (harness, service) = setup().await;
        harness.purchase_standard().await;

        let status = service.pool_status(harness.pool_id).await.unwrap();

        assert!(status.balanced);
        assert_eq!(status.pool.balance.lamports, 1000);
        assert_eq!(status.pool.outstanding_coverage.lamports, 5000);
        assert_eq!(status.pool.active_policies, 1);
        assert_eq!(status.totals.deposits, Lamports::new(1000));
        assert_eq!(status.coverage_ratio, Some(dec!(0.2)));
    }

    #[tokio::test]
    async fn test_pool_status_matches_stored_record() {
        let (harness, service) = setup().await;
        harness.purchase_standard().await;

        let status = service.pool_status(harness.pool_id).await.unwrap();
        let stored = harness.pool().await;

        assert_eq!(status.pool, PoolView::from(&stored));
        assert_eq!(status.totals, stored.totals);
        assert_eq!(status.coverage_ratio, stored.coverage_ratio());
    }

    #[tokio::test]
    async fn test_unknown_pool_is_not_found() {
        let (_harness, service) = setup().await;

        let err = service
            .pool_status(core_kernel::PoolId::new_v7())
            .await
            .unwrap_err();

        assert_eq!(protocol_kind(&err), ErrorKind::PoolNotFound);
    }

    #[tokio::test]
    async fn test_policy_status_lists_history() {
        let (harness, service) = setup().await;
        let policy = harness.purchase_standard().await;
        harness
            .protocol
            .cancel_policy(IdentityFixtures::user(), harness.pool_id, policy)
            .await
            .unwrap();

        let status = service.policy_status(policy).await.unwrap();

        assert_eq!(status.policy.status, PolicyStatus::Canceled);
        assert_eq!(status.policy.refunded.lamports, 1000);
        let actions: Vec<_> = status.history.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![PolicyAction::Created, PolicyAction::Canceled]);
    }

    #[tokio::test]
    async fn test_health_reports_memory_store() {
        let (_harness, service) = setup().await;
        assert_eq!(service.health().await.status, AdapterHealth::Healthy);
    }
}
