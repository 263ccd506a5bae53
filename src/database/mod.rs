//! Transaction record storage
//!
//! The in-memory store is always available. The PostgreSQL store and pool
//! helpers require the `database` feature.

pub mod error;
pub mod in_memory;
pub mod repository;
#[cfg(feature = "database")]
pub mod transaction;
#[cfg(feature = "database")]
pub mod transaction_repository;

pub use in_memory::InMemoryTransactionStore;
pub use repository::{LockedRecord, TransactionStore};
#[cfg(feature = "database")]
pub use transaction_repository::PgTransactionStore;

#[cfg(feature = "database")]
pub use self::postgres::{health_check, init_pool, run_migrations, PoolConfig};

#[cfg(feature = "database")]
mod postgres {
    use super::error::{DatabaseError, DatabaseErrorKind};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use std::time::Duration;
    use tracing::{error as log_error, info, warn};

    /// Database pool configuration
    #[derive(Debug, Clone)]
    pub struct PoolConfig {
        pub max_connections: u32,
        pub min_connections: u32,
        pub connection_timeout: Duration,
        pub idle_timeout: Duration,
        pub max_lifetime: Duration,
    }

    impl Default for PoolConfig {
        fn default() -> Self {
            Self {
                max_connections: 20,
                min_connections: 1,
                connection_timeout: Duration::from_secs(30),
                idle_timeout: Duration::from_secs(600),
                max_lifetime: Duration::from_secs(1800),
            }
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(
        database_url: &str,
        config: Option<PoolConfig>,
    ) -> Result<PgPool, DatabaseError> {
        let config = config.unwrap_or_default();

        info!(
            "Initializing database pool: max_connections={}, min_connections={}, connection_timeout={:?}",
            config.max_connections, config.min_connections, config.connection_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| {
                log_error!("Failed to initialize database pool: {}", e);
                DatabaseError::from_sqlx(e)
            })?;

        info!("Database pool initialized successfully");
        Ok(pool)
    }

    /// Apply the schema in `migrations/`
    pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
            log_error!("Failed to run migrations: {}", e);
            DatabaseError::new(DatabaseErrorKind::QueryError {
                message: e.to_string(),
            })
        })
    }

    /// Connection pool health check
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await.map_err(|e| {
            warn!("Health check failed: {}", e);
            DatabaseError::from_sqlx(e)
        })?;

        Ok(())
    }

}
