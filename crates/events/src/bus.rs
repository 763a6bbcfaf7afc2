//! Event bus backed by a `tokio::sync::broadcast` channel.

use chrono::{DateTime, Utc};
use gramsetu_core::issue::IssueStatus;
use gramsetu_core::lifecycle::Actor;
use gramsetu_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Broadcast channel capacity. Slow subscribers past this lag are
/// skipped forward, not blocked on.
const CHANNEL_CAPACITY: usize = 256;

/// A lifecycle event on one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Dot-separated event name, e.g. `"issue.verified"`.
    pub event_type: String,
    pub issue_id: DbId,
    pub actor_id: DbId,
    pub actor_role: String,
    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl IssueEvent {
    /// Event for a persisted status transition.
    pub fn status_changed(
        issue_id: DbId,
        from: IssueStatus,
        to: IssueStatus,
        actor: &Actor,
    ) -> Self {
        Self {
            event_type: format!("issue.{to}"),
            issue_id,
            actor_id: actor.id,
            actor_role: actor.role.clone(),
            payload: serde_json::json!({
                "from": from.as_str(),
                "to": to.as_str(),
            }),
            timestamp: Utc::now(),
        }
    }

    /// Human-readable notification body for the message timeline.
    pub fn notification_body(&self) -> String {
        match (
            self.payload.get("from").and_then(|v| v.as_str()),
            self.payload.get("to").and_then(|v| v.as_str()),
        ) {
            (Some(from), Some(to)) => format!("Status changed from {from} to {to}"),
            _ => self.event_type.clone(),
        }
    }
}

/// Central publish/subscribe hub, shared via `Arc<EventBus>`.
pub struct EventBus {
    tx: broadcast::Sender<IssueEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. A send error only means there are currently no
    /// subscribers, which is fine.
    pub fn publish(&self, event: IssueEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(error = %err, "No subscribers for issue event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IssueEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use gramsetu_core::roles::ROLE_PDO;

    use super::*;

    fn actor() -> Actor {
        Actor {
            id: 3,
            role: ROLE_PDO.to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(IssueEvent::status_changed(
            7,
            IssueStatus::Submitted,
            IssueStatus::Verified,
            &actor(),
        ));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "issue.verified");
        assert_eq!(event.issue_id, 7);
        assert_eq!(event.actor_role, ROLE_PDO);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(IssueEvent::status_changed(
            1,
            IssueStatus::Resolved,
            IssueStatus::Closed,
            &actor(),
        ));
    }

    #[test]
    fn test_notification_body() {
        let event = IssueEvent::status_changed(
            1,
            IssueStatus::Assigned,
            IssueStatus::InProgress,
            &actor(),
        );
        assert_eq!(
            event.notification_body(),
            "Status changed from assigned to in_progress"
        );
    }
}
