pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                    login (public)
///
/// /issues                        list (GET), report (POST)
/// /issues/escalated              escalated issues (DDO only)
/// /issues/{id}                   detail with progress log
/// /issues/{id}/transition        drive a lifecycle transition (authority only)
/// /issues/{id}/messages          timeline (GET), post chat message (POST)
///
/// /stats/dashboard               aggregation snapshot + recent escalations
/// /stats/performance             panchayat and category rankings
///
/// /reports/export                CSV / JSON export (authority only)
/// ```
///
/// Authentication is enforced per handler via the [`AuthUser`] and RBAC
/// extractors, not by a router-level layer; `/auth/login` is the only
/// public route.
///
/// [`AuthUser`]: crate::middleware::auth::AuthUser
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // -- Auth --
        .route("/auth/login", post(handlers::auth::login))
        // -- Issues --
        .route(
            "/issues",
            get(handlers::issues::list).post(handlers::issues::create),
        )
        .route("/issues/escalated", get(handlers::issues::list_escalated))
        .route("/issues/{id}", get(handlers::issues::get_by_id))
        .route(
            "/issues/{id}/transition",
            post(handlers::issues::transition),
        )
        .route(
            "/issues/{id}/messages",
            get(handlers::messages::list).post(handlers::messages::post),
        )
        // -- Stats --
        .route("/stats/dashboard", get(handlers::stats::dashboard))
        .route("/stats/performance", get(handlers::stats::performance))
        // -- Reports --
        .route("/reports/export", get(handlers::reports::export))
}
