//! Persists issue events into the per-issue message timeline.

use gramsetu_db::models::message::{CreateMessage, KIND_STATUS_CHANGE};
use gramsetu_db::repositories::MessageRepo;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::IssueEvent;

/// Background task that turns every published [`IssueEvent`] into an
/// `issue_messages` row. A failed insert is logged and skipped; the
/// event stream keeps flowing.
pub struct MessagePersistence;

impl MessagePersistence {
    pub async fn run(
        pool: PgPool,
        mut rx: broadcast::Receiver<IssueEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Message persistence shutting down");
                    return;
                }
                received = rx.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Message persistence lagged behind event bus");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed; message persistence stopping");
                        return;
                    }
                },
            };

            let message = CreateMessage {
                issue_id: event.issue_id,
                body: event.notification_body(),
                actor_id: event.actor_id,
                actor_role: event.actor_role.clone(),
                kind: KIND_STATUS_CHANGE.to_string(),
            };

            if let Err(err) = MessageRepo::append(&pool, &message).await {
                tracing::error!(
                    issue_id = event.issue_id,
                    error = %err,
                    "Failed to persist transition notification"
                );
            }
        }
    }
}
