//! Progress log row model. Append-only; the authoritative history of an
//! issue's lifecycle.

use gramsetu_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `issue_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressRow {
    pub id: DbId,
    pub issue_id: DbId,
    pub status: String,
    pub note: Option<String>,
    pub photo_ref: Option<String>,
    pub actor_id: DbId,
    pub actor_role: String,
    pub created_at: Timestamp,
}
