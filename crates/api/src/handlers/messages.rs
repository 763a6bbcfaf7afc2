//! Handlers for the per-issue message timeline.
//!
//! The timeline interleaves free-form chat messages with the automatic
//! status-change notifications written by the event persistence task.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gramsetu_core::error::CoreError;
use gramsetu_core::types::DbId;
use gramsetu_db::models::message::{CreateMessage, MessageRow, KIND_CHAT};
use gramsetu_db::repositories::{IssueRepo, MessageRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Maximum message body length in characters (not bytes: bodies are
/// frequently non-ASCII).
const MAX_BODY_CHARS: usize = 2000;

/// Query parameters for message listing.
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<i64>,
}

/// Request body for posting a chat message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

/// GET /api/v1/issues/{id}/messages
///
/// Timeline for one issue, oldest first.
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
    Query(query): Query<MessageListQuery>,
) -> AppResult<Json<Vec<MessageRow>>> {
    ensure_issue_exists(&state, id).await?;
    let messages = MessageRepo::list_for_issue(&state.pool, id, query.limit).await?;
    Ok(Json(messages))
}

/// POST /api/v1/issues/{id}/messages
///
/// Append a chat message to an issue's timeline.
pub async fn post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<MessageRow>)> {
    let body = validate_body(&input.body)?;

    ensure_issue_exists(&state, id).await?;

    let message = MessageRepo::append(
        &state.pool,
        &CreateMessage {
            issue_id: id,
            body: body.to_string(),
            actor_id: user.user_id,
            actor_role: user.role.clone(),
            kind: KIND_CHAT.to_string(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn ensure_issue_exists(state: &AppState, id: DbId) -> Result<(), AppError> {
    IssueRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "issue",
            id,
        })?;
    Ok(())
}

/// Trim and bound a chat body. The limit counts characters, not bytes.
fn validate_body(input: &str) -> Result<&str, CoreError> {
    let body = input.trim();
    if body.is_empty() {
        return Err(CoreError::Validation(
            "Message body must not be empty".into(),
        ));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(CoreError::Validation(format!(
            "Message body exceeds {MAX_BODY_CHARS} characters"
        )));
    }
    Ok(body)
}
