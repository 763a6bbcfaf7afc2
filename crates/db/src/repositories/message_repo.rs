//! Repository for the `issue_messages` stream.

use gramsetu_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{CreateMessage, MessageRow};

const COLUMNS: &str = "id, issue_id, body, actor_id, actor_role, kind, created_at";

/// Default page size for message listing.
const DEFAULT_LIMIT: i64 = 100;

/// Provides append and read access to per-issue messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Append a message to an issue's stream.
    pub async fn append(pool: &PgPool, input: &CreateMessage) -> Result<MessageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO issue_messages (issue_id, body, actor_id, actor_role, kind)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageRow>(&query)
            .bind(input.issue_id)
            .bind(&input.body)
            .bind(input.actor_id)
            .bind(&input.actor_role)
            .bind(&input.kind)
            .fetch_one(pool)
            .await
    }

    /// Messages for one issue, oldest first.
    pub async fn list_for_issue(
        pool: &PgPool,
        issue_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<MessageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM issue_messages \
             WHERE issue_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, MessageRow>(&query)
            .bind(issue_id)
            .bind(limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(pool)
            .await
    }
}
