//! Handlers for the `/stats` resource: dashboard aggregation and
//! per-group performance.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use gramsetu_core::aggregation::{
    aggregate, category_performance, panchayat_performance, windowed_counts, AggregationOptions,
    AggregationSnapshot, GroupPerformance, DEFAULT_TREND_MONTHS, DEFAULT_WINDOW_DAYS,
};
use gramsetu_core::issue::Issue;
use gramsetu_core::types::DbId;
use gramsetu_db::models::issue::IssueScope;
use gramsetu_db::repositories::IssueRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::issues::IssueView;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Escalations shown on the dashboard.
const RECENT_ESCALATIONS: usize = 5;

/// Query parameters shared by the stats endpoints.
///
/// Kept flat (no nested struct) because query-string deserialization
/// cannot see through `#[serde(flatten)]` for numeric fields.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub district_id: Option<DbId>,
    pub district_name: Option<String>,
    pub panchayat_id: Option<DbId>,
    pub panchayat_name: Option<String>,
    pub category: Option<String>,
    pub window_days: Option<i64>,
    pub trend_months: Option<usize>,
}

impl StatsQuery {
    fn scope(&self) -> IssueScope {
        IssueScope {
            district_id: self.district_id,
            district_name: self.district_name.clone(),
            panchayat_id: self.panchayat_id,
            panchayat_name: self.panchayat_name.clone(),
            category: self.category.clone(),
            ..Default::default()
        }
    }

    fn options(&self) -> AggregationOptions {
        AggregationOptions {
            window_days: self.window_days.unwrap_or(DEFAULT_WINDOW_DAYS),
            trend_months: self.trend_months.unwrap_or(DEFAULT_TREND_MONTHS),
        }
    }
}

/// Dashboard payload: the full aggregation snapshot plus the most
/// recent escalations.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub snapshot: AggregationSnapshot,
    pub recent_escalations: Vec<IssueView>,
}

/// GET /api/v1/stats/dashboard
///
/// One aggregation pass over the full in-scope snapshot. Corrupt rows
/// and a failed escalations sub-query degrade to a warning on the
/// response instead of failing the dashboard; the numbers are then a
/// lower bound.
pub async fn dashboard(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<DashboardResponse>> {
    let now = Utc::now();
    let mut warnings = Vec::new();

    let rows = IssueRepo::list_all(&state.pool, &query.scope()).await?;
    let issues = rows_to_domain(rows, &mut warnings);

    let mut snapshot = aggregate(&issues, query.options(), now);

    let recent_escalations = match IssueRepo::list_escalated(&state.pool, 100).await {
        Ok(rows) => {
            let escalated = rows_to_domain(rows, &mut warnings);
            escalated
                .into_iter()
                .take(RECENT_ESCALATIONS)
                .map(|issue| IssueView::new(issue, None))
                .collect()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Escalations sub-query failed; dashboard degrades");
            warnings.push("Recent escalations unavailable".to_string());
            Vec::new()
        }
    };

    snapshot.warnings = warnings;

    Ok(Json(DashboardResponse {
        snapshot,
        recent_escalations,
    }))
}

/// Per-group performance payload.
#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub window_days: i64,
    /// Resolved count windowed on `resolved_at`.
    pub resolved_within: usize,
    /// Ranked by resolution rate descending; full list, callers truncate.
    pub panchayats: Vec<GroupPerformance>,
    pub categories: Vec<GroupPerformance>,
    /// Non-empty when the snapshot degraded; numbers are a lower bound.
    pub warnings: Vec<String>,
}

/// GET /api/v1/stats/performance
///
/// Panchayat and category rankings over the in-scope snapshot.
pub async fn performance(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<PerformanceResponse>> {
    let now = Utc::now();
    let options = query.options();

    let rows = IssueRepo::list_all(&state.pool, &query.scope()).await?;
    let mut warnings = Vec::new();
    let issues = rows_to_domain(rows, &mut warnings);

    let windowed = windowed_counts(&issues, options.window_days, now);

    Ok(Json(PerformanceResponse {
        window_days: options.window_days,
        resolved_within: windowed.resolved_within,
        panchayats: panchayat_performance(&issues, now),
        categories: category_performance(&issues, now),
        warnings,
    }))
}

/// Convert rows to domain issues, skipping corrupt rows with a warning.
fn rows_to_domain(
    rows: Vec<gramsetu_db::models::issue::IssueRow>,
    warnings: &mut Vec<String>,
) -> Vec<Issue> {
    let total = rows.len();
    let issues: Vec<Issue> = rows
        .into_iter()
        .filter_map(|row| match row.into_domain() {
            Ok(issue) => Some(issue),
            Err(err) => {
                tracing::error!(error = %err, "Skipping corrupt issue row in aggregation");
                None
            }
        })
        .collect();

    let skipped = total - issues.len();
    if skipped > 0 {
        warnings.push(format!("Skipped {skipped} unreadable issue records"));
    }
    issues
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gramsetu_db::models::issue::IssueRow;

    use super::*;

    fn row(status: &str) -> IssueRow {
        IssueRow {
            id: 1,
            display_id: "GS-000001".to_string(),
            category: "Water".to_string(),
            priority: "medium".to_string(),
            status: status.to_string(),
            description: None,
            district_id: None,
            district_name: None,
            taluk_id: None,
            taluk_name: None,
            panchayat_id: None,
            panchayat_name: None,
            village_id: None,
            village_name: None,
            latitude: None,
            longitude: None,
            address: None,
            reporter_id: 1,
            worker_name: None,
            worker_phone: None,
            worker_email: None,
            escalated: false,
            rejection_reason: None,
            resolution_notes: None,
            resolution_photo: None,
            created_at: Utc::now(),
            updated_at: None,
            verified_at: None,
            assigned_at: None,
            in_progress_at: None,
            resolved_at: None,
            escalated_at: None,
            rejected_at: None,
            closed_at: None,
        }
    }

    #[test]
    fn test_corrupt_rows_degrade_with_warning() {
        let mut warnings = Vec::new();
        let issues = rows_to_domain(vec![row("submitted"), row("nonsense")], &mut warnings);
        assert_eq!(issues.len(), 1);
        assert_eq!(warnings, ["Skipped 1 unreadable issue records"]);
    }

    #[test]
    fn test_clean_rows_produce_no_warning() {
        let mut warnings = Vec::new();
        let issues = rows_to_domain(vec![row("submitted"), row("resolved")], &mut warnings);
        assert_eq!(issues.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_performance_response_serializes_warnings() {
        let response = PerformanceResponse {
            window_days: 30,
            resolved_within: 0,
            panchayats: Vec::new(),
            categories: Vec::new(),
            warnings: vec!["Skipped 1 unreadable issue records".to_string()],
        };
        let doc = serde_json::to_value(&response).unwrap();
        assert_eq!(doc["warnings"][0], "Skipped 1 unreadable issue records");
    }
}
