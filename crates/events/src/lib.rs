//! In-process eventing for issue lifecycle transitions.
//!
//! The API layer publishes an [`IssueEvent`] after every persisted
//! transition; the [`MessagePersistence`] task consumes the stream and
//! appends a notification to the issue's message timeline. Publication
//! is fire-and-forget: losing a notification never fails the transition.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, IssueEvent};
pub use persistence::MessagePersistence;
