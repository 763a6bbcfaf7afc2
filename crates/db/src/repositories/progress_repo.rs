//! Repository for the append-only `issue_progress` log.

use gramsetu_core::lifecycle::ProgressEntry;
use gramsetu_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::progress::ProgressRow;

const COLUMNS: &str = "id, issue_id, status, note, photo_ref, actor_id, actor_role, created_at";

/// Provides append and read access to the progress log. There is no
/// update or delete: history is immutable.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Append one transition entry. Generic over the executor so the
    /// append can run inside the same transaction as the status update.
    pub async fn append<'e>(
        executor: impl PgExecutor<'e>,
        issue_id: DbId,
        entry: &ProgressEntry,
    ) -> Result<ProgressRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO issue_progress (issue_id, status, note, photo_ref, actor_id, actor_role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(issue_id)
            .bind(entry.status.as_str())
            .bind(&entry.note)
            .bind(&entry.photo_ref)
            .bind(entry.actor_id)
            .bind(&entry.actor_role)
            .bind(entry.at)
            .fetch_one(executor)
            .await
    }

    /// Full history for one issue, oldest first.
    pub async fn list_for_issue(
        pool: &PgPool,
        issue_id: DbId,
    ) -> Result<Vec<ProgressRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM issue_progress \
             WHERE issue_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(issue_id)
            .fetch_all(pool)
            .await
    }
}
