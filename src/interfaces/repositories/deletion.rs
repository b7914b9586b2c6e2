use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    entities::deletion::{DeletionStep, PendingDeletion},
    errors::AppError,
    repositories::{memory_repo::MemoryDeletionLedger, sqlx_repo::SqlxDeletionLedger},
};

/// Durable record of user deletions that have not finished every step.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeletionLedger: Send + Sync {
    /// Inserts or overwrites the tombstone for `pending.user_id`.
    async fn record(&self, pending: &PendingDeletion) -> Result<(), AppError>;
    async fn get(&self, user_id: &str) -> Result<Option<PendingDeletion>, AppError>;
    async fn list_pending(&self) -> Result<Vec<PendingDeletion>, AppError>;
    async fn complete(&self, user_id: &str) -> Result<(), AppError>;
}

#[derive(sqlx::FromRow)]
struct PendingDeletionRow {
    user_id: String,
    next_step: String,
    attempts: i32,
    last_error: Option<String>,
    requested_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PendingDeletionRow> for PendingDeletion {
    type Error = AppError;

    fn try_from(row: PendingDeletionRow) -> Result<Self, Self::Error> {
        let next_step = row
            .next_step
            .parse::<DeletionStep>()
            .map_err(|e| AppError::dependency("deletions.decode", e))?;

        Ok(PendingDeletion {
            user_id: row.user_id,
            next_step,
            attempts: u32::try_from(row.attempts).unwrap_or_default(),
            last_error: row.last_error,
            requested_at: row.requested_at,
            updated_at: row.updated_at,
        })
    }
}

impl SqlxDeletionLedger {
    pub fn new(pool: PgPool) -> Self {
        SqlxDeletionLedger { pool }
    }
}

#[async_trait]
impl DeletionLedger for SqlxDeletionLedger {
    async fn record(&self, pending: &PendingDeletion) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO pending_user_deletions (user_id, next_step, attempts, last_error, requested_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET next_step = EXCLUDED.next_step,
                attempts = EXCLUDED.attempts,
                last_error = EXCLUDED.last_error,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&pending.user_id)
        .bind(pending.next_step.as_str())
        .bind(i32::try_from(pending.attempts).unwrap_or(i32::MAX))
        .bind(&pending.last_error)
        .bind(pending.requested_at)
        .bind(pending.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("deletions.record", e))?;

        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<PendingDeletion>, AppError> {
        let row = sqlx::query_as::<_, PendingDeletionRow>(
            "SELECT user_id, next_step, attempts, last_error, requested_at, updated_at FROM pending_user_deletions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::dependency("deletions.get", e))?;

        row.map(PendingDeletion::try_from).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<PendingDeletion>, AppError> {
        sqlx::query_as::<_, PendingDeletionRow>(
            "SELECT user_id, next_step, attempts, last_error, requested_at, updated_at FROM pending_user_deletions ORDER BY requested_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::dependency("deletions.list", e))?
        .into_iter()
        .map(PendingDeletion::try_from)
        .collect()
    }

    async fn complete(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_user_deletions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::dependency("deletions.complete", e))?;

        Ok(())
    }
}

impl MemoryDeletionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeletionLedger for MemoryDeletionLedger {
    async fn record(&self, pending: &PendingDeletion) -> Result<(), AppError> {
        self.pending.insert(pending.user_id.clone(), pending.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<PendingDeletion>, AppError> {
        Ok(self.pending.get(user_id).map(|p| p.clone()))
    }

    async fn list_pending(&self) -> Result<Vec<PendingDeletion>, AppError> {
        let mut pending: Vec<PendingDeletion> = self.pending.iter().map(|p| p.value().clone()).collect();
        pending.sort_by_key(|p| p.requested_at);
        Ok(pending)
    }

    async fn complete(&self, user_id: &str) -> Result<(), AppError> {
        self.pending.remove(user_id);
        Ok(())
    }
}
