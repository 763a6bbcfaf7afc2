//! Read-only repository for the `fund_requests` table.

use gramsetu_core::types::DbId;
use sqlx::PgPool;

use crate::models::fund_request::FundRequestRow;

const COLUMNS: &str =
    "id, issue_id, amount, status, panchayat_id, district_id, created_at, approved_at";

/// Provides read access to fund requests for the display-status overlay.
pub struct FundRequestRepo;

impl FundRequestRepo {
    /// Latest fund request for a single issue, if any.
    pub async fn latest_for_issue(
        pool: &PgPool,
        issue_id: DbId,
    ) -> Result<Option<FundRequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fund_requests \
             WHERE issue_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, FundRequestRow>(&query)
            .bind(issue_id)
            .fetch_optional(pool)
            .await
    }

    /// Latest fund request per issue for a batch of issue ids, in one
    /// round trip.
    pub async fn latest_for_issues(
        pool: &PgPool,
        issue_ids: &[DbId],
    ) -> Result<Vec<FundRequestRow>, sqlx::Error> {
        if issue_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT DISTINCT ON (issue_id) {COLUMNS} FROM fund_requests \
             WHERE issue_id = ANY($1) \
             ORDER BY issue_id, created_at DESC"
        );
        sqlx::query_as::<_, FundRequestRow>(&query)
            .bind(issue_ids)
            .fetch_all(pool)
            .await
    }
}
