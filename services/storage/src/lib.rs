//! Postgres persistence for carbonledger.
//!
//! Every repository method here issues a plain `sqlx::query_as` with an
//! explicit SQL string rather than the compile-time-verified `query!`
//! family: this crate must build without a live database reachable at
//! compile time.

pub mod repositories;

use carbonledger_core::config::{Config, TlsMode};
use carbonledger_core::error::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

/// Owns the connection pool. Cloning is cheap (`PgPool` is an `Arc` internally).
#[derive(Clone)]
pub struct Storage {
    pub pool: PgPool,
}

impl Storage {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let ssl_mode = match config.database.tls_mode {
            TlsMode::Disable => PgSslMode::Disable,
            TlsMode::Prefer => PgSslMode::Prefer,
            TlsMode::Require => PgSslMode::Require,
        };

        let connect_options: PgConnectOptions = config
            .database
            .url
            .parse::<PgConnectOptions>()
            .map_err(|e| AppError::Internal(format!("invalid DATABASE_URL: {e}")))?
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(config.database.acquire_timeout)
            .idle_timeout(Some(config.database.idle_timeout))
            .test_before_acquire(true)
            .connect_with(connect_options)
            .await
            .map_err(|e| AppError::Transient(format!("database connect failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Used by integration tests that already hold a pool (e.g. `sqlx::test`).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
