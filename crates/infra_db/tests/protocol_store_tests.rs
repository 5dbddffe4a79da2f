//! PostgreSQL protocol store tests
//!
//! These start a PostgreSQL container and are ignored by default. Run with
//! `cargo test -p infra_db -- --ignored` on a host with Docker.

use std::sync::Arc;

use core_kernel::{HealthCheckable, Identity, Lamports, PolicyId, PoolId};
use domain_policy::{PolicyAction, PolicyAmounts, PolicyStatus};
use domain_pool::InsurancePool;
use domain_protocol::{
    ErrorKind, InsuranceProtocol, ProtocolConfig, ProtocolStore,
};
use infra_db::PostgresProtocolStore;
use test_utils::{
    assert_conserved, assert_error_kind, get_shared_test_database, AmountFixtures,
    IdentityFixtures,
};

async fn protocol() -> (Arc<InsuranceProtocol>, PostgresProtocolStore) {
    let db = get_shared_test_database().await;
    let store = PostgresProtocolStore::new(db.pool().clone());
    let protocol = InsuranceProtocol::new(Arc::new(store.clone()), ProtocolConfig::default());
    (Arc::new(protocol), store)
}

mod store_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_health_check() {
        let (_, store) = protocol().await;
        let result = store.health_check().await;
        assert_eq!(result.status, core_kernel::AdapterHealth::Healthy);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_dropped_transaction_rolls_back() {
        let (_, store) = protocol().await;
        let pool = InsurancePool::new(PoolId::new_v7(), Identity::new(), 9, chrono::Utc::now());

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_pool(&pool).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.pool_for_update(pool.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_duplicate_pool_conflicts() {
        let (_, store) = protocol().await;
        let pool = InsurancePool::new(PoolId::new_v7(), Identity::new(), 1, chrono::Utc::now());

        let mut tx = store.begin().await.unwrap();
        tx.insert_pool(&pool).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_pool(&pool).await.unwrap_err();
        assert!(err.is_conflict());
    }
}

mod protocol_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_lifecycle_round_trips_through_postgres() {
        let (protocol, _) = protocol().await;
        let pool_id = PoolId::new_v7();
        let authority = IdentityFixtures::authority();
        let user = IdentityFixtures::user();

        protocol.initialize_pool(authority, pool_id, 255).await.unwrap();
        let receipt = protocol
            .purchase_insurance(user, pool_id, None, AmountFixtures::standard_purchase())
            .await
            .unwrap();
        let policy_id = receipt.policy.unwrap().id();

        let result = protocol.approve_claim(authority, pool_id, policy_id).await;
        assert_error_kind(&result, ErrorKind::InsufficientFunds);

        protocol
            .contribute_capital(authority, pool_id, Lamports::new(4000))
            .await
            .unwrap();
        protocol.approve_claim(authority, pool_id, policy_id).await.unwrap();

        let pool = protocol.pool(pool_id).await.unwrap();
        assert_eq!(pool.total_balance, Lamports::ZERO);
        assert_eq!(pool.bump, 255);
        assert_conserved(&pool);

        let policy = protocol.policy(policy_id).await.unwrap();
        assert_eq!(policy.status(), PolicyStatus::ClaimApproved);
        assert_eq!(policy.paid_out_amount(), Lamports::new(5000));

        let history = protocol.policy_history(policy_id).await.unwrap();
        let actions: Vec<_> = history.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![PolicyAction::Created, PolicyAction::ClaimApproved]);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_initialize_twice_in_postgres() {
        let (protocol, _) = protocol().await;
        let pool_id = PoolId::new_v7();

        protocol
            .initialize_pool(IdentityFixtures::authority(), pool_id, 0)
            .await
            .unwrap();
        let result = protocol
            .initialize_pool(IdentityFixtures::stranger(), pool_id, 0)
            .await;
        assert_error_kind(&result, ErrorKind::AlreadyInitialized);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_concurrent_approvals_pay_once() {
        let (protocol, _) = protocol().await;
        let pool_id = PoolId::new_v7();
        let authority = IdentityFixtures::authority();

        protocol.initialize_pool(authority, pool_id, 0).await.unwrap();
        protocol
            .contribute_capital(authority, pool_id, Lamports::new(50_000))
            .await
            .unwrap();
        let policy_id = PolicyId::new_v7();
        protocol
            .purchase_insurance(
                IdentityFixtures::user(),
                pool_id,
                Some(policy_id),
                PolicyAmounts::new(1000, 100, 5000),
            )
            .await
            .unwrap();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let protocol = Arc::clone(&protocol);
                tokio::spawn(async move { protocol.approve_claim(authority, pool_id, policy_id).await })
            })
            .collect();

        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                approved += 1;
            }
        }

        assert_eq!(approved, 1);
        let pool = protocol.pool(pool_id).await.unwrap();
        assert_eq!(pool.total_balance, Lamports::new(46_000));
        assert_conserved(&pool);
    }
}
