//! PostgreSQL ledger store.
//!
//! Expects two tables:
//! - `processed_videos (video_id, status, processed_at)`
//! - `process_errors_log (error_details json, created_at)`

use crate::config::PostgresConfig;
use crate::domain::jobs::{ErrorRecord, JobId};
use crate::error::LedgerError;
use crate::ports::ledger::LedgerStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

pub const STATUS_SUCCESS: &str = "success";

#[derive(Clone, Debug)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and check the server answers.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url())
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!(host = %config.host, db = %config.dbname, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn has_success(&self, job_id: JobId) -> Result<bool, LedgerError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_videos WHERE video_id = $1 AND status = $2)",
        )
        .bind(job_id)
        .bind(STATUS_SUCCESS)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_success(&self, job_id: JobId) -> Result<(), LedgerError> {
        // Duplicate deliveries converge on a single success row.
        sqlx::query(
            r#"
            INSERT INTO processed_videos (video_id, status, processed_at)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (
                SELECT 1 FROM processed_videos WHERE video_id = $1 AND status = $2
            )
            "#,
        )
        .bind(job_id)
        .bind(STATUS_SUCCESS)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_error(&self, record: &ErrorRecord) -> Result<(), LedgerError> {
        sqlx::query("INSERT INTO process_errors_log (error_details, created_at) VALUES ($1, $2)")
            .bind(Json(record))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
