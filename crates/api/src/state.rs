use std::sync::Arc;

use gramsetu_events::EventBus;
use sqlx::PgPool;

use crate::config::ServerConfig;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub event_bus: Arc<EventBus>,
}
