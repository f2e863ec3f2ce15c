//! PostgreSQL connection pool.
//!
//! One pool shared by all repository calls. Migrations from the workspace
//! `migrations/` directory are applied when the pool is created.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Pooled PostgreSQL connections with the schema migrated.
#[derive(Clone)]
pub struct PgDatabasePool {
    pub pool: PgPool,
}

impl PgDatabasePool {
    /// Connect to `database_url` and run migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(database_url)?;
        Self::connect_with(options, max_connections).await
    }

    /// Connect with explicit options and run migrations.
    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_with(options)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::debug!(max_connections, "PostgreSQL pool ready");

        Ok(Self { pool })
    }
}
