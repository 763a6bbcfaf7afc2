//! Handlers for the `/issues` resource: reporting, listing, detail, and
//! lifecycle transitions.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use gramsetu_core::error::CoreError;
use gramsetu_core::issue::{display_status, new_display_id, FundStatus, Issue, IssueStatus, Priority};
use gramsetu_core::lifecycle::{apply_transition, TransitionPayload};
use gramsetu_core::types::DbId;
use gramsetu_db::models::issue::{CreateIssue, IssueScope};
use gramsetu_db::models::progress::ProgressRow;
use gramsetu_db::repositories::{FundRequestRepo, IssueRepo, ProgressRepo};
use gramsetu_events::IssueEvent;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAuthority, RequireDdo};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// An issue as returned to clients: the record itself plus the derived
/// display status (the fund-request overlay applied on top of the
/// lifecycle status).
#[derive(Debug, Serialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub display_status: &'static str,
}

impl IssueView {
    pub(crate) fn new(issue: Issue, fund: Option<FundStatus>) -> Self {
        let display_status = display_status(issue.status, fund);
        Self {
            issue,
            display_status,
        }
    }
}

/// Detail view: the issue plus its full progress log.
#[derive(Debug, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub view: IssueView,
    pub progress: Vec<ProgressRow>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/issues
///
/// List issues in a jurisdiction scope, newest first, with the
/// fund-request overlay applied per issue in one batched query.
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(scope): Query<IssueScope>,
) -> AppResult<Json<Vec<IssueView>>> {
    let rows = IssueRepo::list(&state.pool, &scope).await?;

    let issues: Vec<Issue> = rows
        .into_iter()
        .map(|row| row.into_domain())
        .collect::<Result<_, _>>()?;

    let ids: Vec<DbId> = issues.iter().map(|i| i.id).collect();
    let funds = fund_overlay(&state, &ids).await?;

    let views = issues
        .into_iter()
        .map(|issue| {
            let fund = funds.get(&issue.id).copied();
            IssueView::new(issue, fund)
        })
        .collect();
    Ok(Json(views))
}

/// POST /api/v1/issues
///
/// Report a new issue. Any authenticated user may report; the issue
/// starts in `submitted` with a generated display id.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateIssue>,
) -> AppResult<(StatusCode, Json<IssueView>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let priority = match &input.priority {
        Some(p) => Priority::parse(p)?,
        None => Priority::Medium,
    };

    let display_id = new_display_id();
    let row = IssueRepo::create(
        &state.pool,
        user.user_id,
        &display_id,
        priority.as_str(),
        &input,
    )
    .await?;
    let issue = row.into_domain()?;

    tracing::info!(
        issue_id = issue.id,
        display_id = %issue.display_id,
        category = %issue.category,
        "Issue reported"
    );

    Ok((StatusCode::CREATED, Json(IssueView::new(issue, None))))
}

/// GET /api/v1/issues/{id}
///
/// Issue detail: the record, the fund overlay, and the progress log.
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<IssueDetail>> {
    let issue = find_issue(&state, id).await?;

    let fund = FundRequestRepo::latest_for_issue(&state.pool, id)
        .await?
        .and_then(|row| FundStatus::parse(&row.status).ok());
    let progress = ProgressRepo::list_for_issue(&state.pool, id).await?;

    Ok(Json(IssueDetail {
        view: IssueView::new(issue, fund),
        progress,
    }))
}

/// Request body for `POST /issues/{id}/transition`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status in wire form, e.g. `"verified"`.
    pub target: String,
    #[serde(flatten)]
    pub payload: TransitionPayload,
}

/// POST /api/v1/issues/{id}/transition
///
/// Drive a lifecycle transition. The engine validates the edge, the
/// acting role, and the payload; persistence is a conditional update on
/// the previous status, so a concurrent transition surfaces as 409 and
/// the client refetches and retries.
pub async fn transition(
    State(state): State<AppState>,
    RequireAuthority(user): RequireAuthority,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest>,
) -> AppResult<Json<IssueView>> {
    let target = IssueStatus::parse(&input.target)?;

    let issue = find_issue(&state, id).await?;
    let previous = issue.status;

    let (updated, entry) = apply_transition(
        &issue,
        target,
        &input.payload,
        &user.actor(),
        &state.config.lifecycle,
        Utc::now(),
    )?;

    // Status update and log append commit together; a conflict means
    // another authority won the race and nothing was written.
    let row = IssueRepo::transition_update(&state.pool, id, previous, &updated, &entry)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Issue was modified concurrently; refetch and retry".into(),
            ))
        })?;
    let persisted = row.into_domain()?;

    state.event_bus.publish(IssueEvent::status_changed(
        id,
        previous,
        target,
        &user.actor(),
    ));

    tracing::info!(
        issue_id = id,
        from = %previous,
        to = %target,
        actor_id = user.user_id,
        "Issue transitioned"
    );

    let fund = FundRequestRepo::latest_for_issue(&state.pool, id)
        .await?
        .and_then(|row| FundStatus::parse(&row.status).ok());
    Ok(Json(IssueView::new(persisted, fund)))
}

/// GET /api/v1/issues/escalated
///
/// Escalated issues, most recently escalated first. Escalations hand
/// off to the district level, so this surface is DDO-only.
pub async fn list_escalated(
    State(state): State<AppState>,
    RequireDdo(_user): RequireDdo,
) -> AppResult<Json<Vec<IssueView>>> {
    let rows = IssueRepo::list_escalated(&state.pool, 100).await?;
    let issues: Vec<Issue> = rows
        .into_iter()
        .map(|row| row.into_domain())
        .collect::<Result<_, _>>()?;

    let ids: Vec<DbId> = issues.iter().map(|i| i.id).collect();
    let funds = fund_overlay(&state, &ids).await?;

    let views = issues
        .into_iter()
        .map(|issue| {
            let fund = funds.get(&issue.id).copied();
            IssueView::new(issue, fund)
        })
        .collect();
    Ok(Json(views))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load an issue or map its absence to 404.
async fn find_issue(state: &AppState, id: DbId) -> Result<Issue, AppError> {
    let row = IssueRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "issue",
            id,
        })?;
    Ok(row.into_domain()?)
}

/// Latest fund status per issue for a batch of issue ids. Rows with an
/// unrecognised status are skipped rather than failing the listing.
async fn fund_overlay(
    state: &AppState,
    ids: &[DbId],
) -> Result<HashMap<DbId, FundStatus>, AppError> {
    let rows = FundRequestRepo::latest_for_issues(&state.pool, ids).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            FundStatus::parse(&row.status)
                .ok()
                .map(|status| (row.issue_id, status))
        })
        .collect())
}
