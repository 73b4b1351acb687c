//! PostgreSQL backend. Schema lives in the embedded `migrations/`.
//!
//! Read-modify-write operations lock the target row with `FOR UPDATE`,
//! merge the patch in Rust and write the whole row back in the same
//! transaction.

mod catalog;
mod logs;
mod medications;
mod patterns;
pub mod query_builder;
mod records;
mod users;

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `./migrations`.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Whether `owner` has a medication `id`; takes a share lock so the parent
/// cannot disappear while the caller writes a child row.
async fn lock_medication(conn: &mut PgConnection, owner: Uuid, id: Uuid) -> StoreResult<bool> {
    let found: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM medications WHERE id = $1 AND user_id = $2 FOR SHARE")
            .bind(id)
            .bind(owner)
            .fetch_optional(conn)
            .await?;
    Ok(found.is_some())
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
