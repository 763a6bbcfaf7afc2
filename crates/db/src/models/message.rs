//! Per-issue message stream row model. Fed by the event persistence
//! task on lifecycle transitions and by chat-style surfaces.

use gramsetu_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Message kind recorded for an automatic transition notification.
pub const KIND_STATUS_CHANGE: &str = "status_change";

/// Message kind for free-form user chatter.
pub const KIND_CHAT: &str = "chat";

/// A row from the `issue_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageRow {
    pub id: DbId,
    pub issue_id: DbId,
    pub body: String,
    pub actor_id: DbId,
    pub actor_role: String,
    pub kind: String,
    pub created_at: Timestamp,
}

/// DTO for appending a message.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub issue_id: DbId,
    pub body: String,
    pub actor_id: DbId,
    pub actor_role: String,
    pub kind: String,
}
