//! Throwaway PostgreSQL for adapter tests
//!
//! Each [`TestDatabase`] owns a container with the protocol schema applied.
//! Tests that tolerate shared state use [`get_shared_test_database`] and
//! call [`TestDatabase::clear_data`] first.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use infra_db::{create_pool, run_migrations, DatabaseConfig};

const IMAGE_TAG: &str = "16-alpine";
const CONTAINER_PORT: u16 = 5432;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Credentials the container is started with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDatabaseConfig {
    pub user: &'static str,
    pub password: &'static str,
    pub database: &'static str,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: "protocol",
            password: "protocol",
            database: "protocol_test",
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, host, port, self.database
        )
    }
}

pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub url: String,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not start or the schema fails
    /// to apply
    pub async fn start(config: TestDatabaseConfig) -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_user(config.user)
            .with_password(config.password)
            .with_db_name(config.database)
            .with_tag(IMAGE_TAG)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(CONTAINER_PORT).await?;
        let url = config.connection_url(&host, port);

        let pool = create_pool(
            DatabaseConfig::new(url.clone())
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(30))
                .application_name("protocol-tests"),
        )
        .await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Deletes every row, keeping the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        sqlx::query("TRUNCATE TABLE policy_history, insurance_policies, insurance_pools")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

static SHARED: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Database shared by every test in the binary
///
/// # Panics
///
/// Panics if the container fails to start
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED
        .get_or_init(|| async {
            let db = TestDatabase::start(TestDatabaseConfig::default())
                .await
                .expect("failed to start shared test database");
            Arc::new(db)
        })
        .await
        .clone()
}

/// Database owned by a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::start(TestDatabaseConfig::default()).await
}
