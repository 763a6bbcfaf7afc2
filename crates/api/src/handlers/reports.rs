//! Handlers for report export.
//!
//! The projection in `gramsetu_core::report` produces the sheets; this
//! layer only serializes them (CSV bytes or a JSON document) and sets
//! download headers.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use gramsetu_core::aggregation::{aggregate, AggregationOptions};
use gramsetu_core::report::{issues_sheet, summary_json, workbook};
use gramsetu_core::types::DbId;
use gramsetu_db::models::issue::IssueScope;
use gramsetu_db::repositories::IssueRepo;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuthority;
use crate::state::AppState;

/// Query parameters for `GET /reports/export`. Scope fields are kept
/// flat, same as the stats endpoints.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `csv` (default) or `json`.
    pub format: Option<String>,
    pub district_id: Option<DbId>,
    pub district_name: Option<String>,
    pub panchayat_id: Option<DbId>,
    pub panchayat_name: Option<String>,
    pub category: Option<String>,
}

impl ExportQuery {
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
}

/// GET /api/v1/reports/export
///
/// Export the in-scope issues. `format=csv` streams the flat issues
/// sheet as a file download; `format=json` returns the summary document
/// plus the full workbook.
pub async fn export(
    State(state): State<AppState>,
    RequireAuthority(_user): RequireAuthority,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let now = Utc::now();
    let rows = IssueRepo::list_all(&state.pool, &query.scope()).await?;
    let issues: Vec<_> = rows
        .into_iter()
        .map(|row| row.into_domain())
        .collect::<Result<_, _>>()?;

    match query.format.as_deref().unwrap_or("csv") {
        "csv" => {
            let sheet = issues_sheet(&issues);
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer
                .write_record(&sheet.headers)
                .map_err(|e| AppError::InternalError(format!("CSV write error: {e}")))?;
            for row in &sheet.rows {
                writer
                    .write_record(row)
                    .map_err(|e| AppError::InternalError(format!("CSV write error: {e}")))?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| AppError::InternalError(format!("CSV flush error: {e}")))?;

            let filename = format!("issues-{}.csv", now.format("%Y-%m-%d"));
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response())
        }
        "json" => {
            let snapshot = aggregate(&issues, AggregationOptions::default(), now);
            let doc = json!({
                "summary": summary_json(&snapshot),
                "sheets": workbook(&snapshot, &issues),
            });
            Ok(Json(doc).into_response())
        }
        other => Err(AppError::BadRequest(format!(
            "Unknown export format '{other}'. Use 'csv' or 'json'"
        ))),
    }
}
