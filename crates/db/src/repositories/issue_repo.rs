//! Repository for the `issues` table.

use gramsetu_core::issue::{Issue, IssueStatus};
use gramsetu_core::lifecycle::ProgressEntry;
use gramsetu_core::types::DbId;
use sqlx::PgPool;

use crate::models::issue::{CreateIssue, IssueRow, IssueScope};
use crate::repositories::ProgressRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, display_id, category, priority, status, description, \
     district_id, district_name, taluk_id, taluk_name, \
     panchayat_id, panchayat_name, village_id, village_name, \
     latitude, longitude, address, \
     reporter_id, worker_name, worker_phone, worker_email, \
     escalated, rejection_reason, resolution_notes, resolution_photo, \
     created_at, updated_at, verified_at, assigned_at, in_progress_at, \
     resolved_at, escalated_at, rejected_at, closed_at";

/// Default page size for issue listing.
const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for issue listing.
const MAX_LIMIT: i64 = 500;

type IssueQuery<'q> =
    sqlx::query::QueryAs<'q, sqlx::Postgres, IssueRow, sqlx::postgres::PgArguments>;

/// Clamp a client-supplied page size to `[1, MAX_LIMIT]`. Scope values
/// come straight from the query string, so negatives must not reach
/// Postgres as `LIMIT -5`.
fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Clamp a client-supplied offset to be non-negative.
fn page_offset(requested: Option<i64>) -> i64 {
    requested.unwrap_or(0).max(0)
}

/// Build the WHERE clause for a jurisdiction scope. Returns the clause
/// (possibly empty) and the next free bind index.
fn scope_where(scope: &IssueScope) -> (String, u32) {
    let mut conditions = Vec::new();
    let mut bind_idx = 1u32;

    match (scope.district_id, &scope.district_name) {
        (Some(_), Some(_)) => {
            conditions.push(format!(
                "(district_id = ${bind_idx} OR district_name = ${})",
                bind_idx + 1
            ));
            bind_idx += 2;
        }
        (Some(_), None) => {
            conditions.push(format!("district_id = ${bind_idx}"));
            bind_idx += 1;
        }
        (None, Some(_)) => {
            conditions.push(format!("district_name = ${bind_idx}"));
            bind_idx += 1;
        }
        (None, None) => {}
    }

    match (scope.panchayat_id, &scope.panchayat_name) {
        (Some(_), Some(_)) => {
            conditions.push(format!(
                "(panchayat_id = ${bind_idx} OR panchayat_name = ${})",
                bind_idx + 1
            ));
            bind_idx += 2;
        }
        (Some(_), None) => {
            conditions.push(format!("panchayat_id = ${bind_idx}"));
            bind_idx += 1;
        }
        (None, Some(_)) => {
            conditions.push(format!("panchayat_name = ${bind_idx}"));
            bind_idx += 1;
        }
        (None, None) => {}
    }

    if scope.status.is_some() {
        conditions.push(format!("status = ${bind_idx}"));
        bind_idx += 1;
    }
    if scope.category.is_some() {
        conditions.push(format!("category = ${bind_idx}"));
        bind_idx += 1;
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, bind_idx)
}

/// Bind the scope parameters in the same order `scope_where` numbered them.
fn bind_scope<'q>(mut q: IssueQuery<'q>, scope: &'q IssueScope) -> IssueQuery<'q> {
    match (scope.district_id, &scope.district_name) {
        (Some(id), Some(name)) => q = q.bind(id).bind(name),
        (Some(id), None) => q = q.bind(id),
        (None, Some(name)) => q = q.bind(name),
        (None, None) => {}
    }
    match (scope.panchayat_id, &scope.panchayat_name) {
        (Some(id), Some(name)) => q = q.bind(id).bind(name),
        (Some(id), None) => q = q.bind(id),
        (None, Some(name)) => q = q.bind(name),
        (None, None) => {}
    }
    if let Some(ref status) = scope.status {
        q = q.bind(status);
    }
    if let Some(ref category) = scope.category {
        q = q.bind(category);
    }
    q
}

/// Provides CRUD and lifecycle persistence for issues.
pub struct IssueRepo;

impl IssueRepo {
    /// Insert a newly reported issue in `submitted` status.
    pub async fn create(
        pool: &PgPool,
        reporter_id: DbId,
        display_id: &str,
        priority: &str,
        input: &CreateIssue,
    ) -> Result<IssueRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO issues (
                display_id, category, priority, status, description,
                district_id, district_name, taluk_id, taluk_name,
                panchayat_id, panchayat_name, village_id, village_name,
                latitude, longitude, address, reporter_id
             )
             VALUES ($1, $2, $3, 'submitted', $4,
                     $5, $6, $7, $8, $9, $10, $11, $12,
                     $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(display_id)
            .bind(&input.category)
            .bind(priority)
            .bind(&input.description)
            .bind(input.district_id)
            .bind(&input.district_name)
            .bind(input.taluk_id)
            .bind(&input.taluk_name)
            .bind(input.panchayat_id)
            .bind(&input.panchayat_name)
            .bind(input.village_id)
            .bind(&input.village_name)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(&input.address)
            .bind(reporter_id)
            .fetch_one(pool)
            .await
    }

    /// Find an issue by its internal id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<IssueRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM issues WHERE id = $1");
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List issues matching a jurisdiction scope, newest first.
    ///
    /// District and panchayat filters match by id OR by denormalized
    /// name when both are supplied, de-duplicated by primary key inside
    /// the single query (legacy rows are sometimes keyed only by name).
    pub async fn list(pool: &PgPool, scope: &IssueScope) -> Result<Vec<IssueRow>, sqlx::Error> {
        let limit = page_limit(scope.limit);
        let offset = page_offset(scope.offset);

        let (where_clause, bind_idx) = scope_where(scope);
        let query = format!(
            "SELECT {COLUMNS} FROM issues {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${next_idx}",
            next_idx = bind_idx + 1,
        );

        let q = bind_scope(sqlx::query_as::<_, IssueRow>(&query), scope);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Fetch every issue in scope, unpaged. Input to the aggregation
    /// engine, which needs the full snapshot rather than a page.
    pub async fn list_all(pool: &PgPool, scope: &IssueScope) -> Result<Vec<IssueRow>, sqlx::Error> {
        let (where_clause, _) = scope_where(scope);
        let query =
            format!("SELECT {COLUMNS} FROM issues {where_clause} ORDER BY created_at DESC");
        bind_scope(sqlx::query_as::<_, IssueRow>(&query), scope)
            .fetch_all(pool)
            .await
    }

    /// Persist the outcome of a lifecycle transition: a conditional
    /// update on the previous status plus the progress-log append, in
    /// one transaction so the status can never advance without its log
    /// tip.
    ///
    /// Returns `None` when no row matched `id` + `expected` — either the
    /// issue does not exist or another authority transitioned it first.
    /// Callers map `None` to a conflict and ask the client to refetch.
    pub async fn transition_update(
        pool: &PgPool,
        id: DbId,
        expected: IssueStatus,
        updated: &Issue,
        entry: &ProgressEntry,
    ) -> Result<Option<IssueRow>, sqlx::Error> {
        let query = format!(
            "UPDATE issues SET
                status = $3,
                updated_at = $4,
                escalated = $5,
                worker_name = $6,
                worker_phone = $7,
                worker_email = $8,
                rejection_reason = $9,
                resolution_notes = $10,
                resolution_photo = $11,
                verified_at = $12,
                assigned_at = $13,
                in_progress_at = $14,
                resolved_at = $15,
                escalated_at = $16,
                rejected_at = $17,
                closed_at = $18
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );

        let mut tx = pool.begin().await?;

        let row = sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(updated.status.as_str())
            .bind(updated.updated_at)
            .bind(updated.escalated)
            .bind(updated.assigned_worker.as_ref().map(|w| w.name.clone()))
            .bind(updated.assigned_worker.as_ref().map(|w| w.phone.clone()))
            .bind(
                updated
                    .assigned_worker
                    .as_ref()
                    .and_then(|w| w.email.clone()),
            )
            .bind(&updated.rejection_reason)
            .bind(&updated.resolution_notes)
            .bind(&updated.resolution_photo)
            .bind(updated.verified_at)
            .bind(updated.assigned_at)
            .bind(updated.in_progress_at)
            .bind(updated.resolved_at)
            .bind(updated.escalated_at)
            .bind(updated.rejected_at)
            .bind(updated.closed_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        ProgressRepo::append(&mut *tx, id, entry).await?;
        tx.commit().await?;

        Ok(Some(row))
    }

    /// List escalated issues, most recently escalated first.
    pub async fn list_escalated(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<IssueRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM issues \
             WHERE escalated = TRUE \
             ORDER BY escalated_at DESC NULLS LAST, created_at DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(limit.clamp(1, MAX_LIMIT))
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_clamps_both_ends() {
        assert_eq!(page_limit(None), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some(25)), 25);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_limit(Some(-5)), 1);
        assert_eq!(page_limit(Some(10_000)), MAX_LIMIT);
    }

    #[test]
    fn test_page_offset_never_negative() {
        assert_eq!(page_offset(None), 0);
        assert_eq!(page_offset(Some(-3)), 0);
        assert_eq!(page_offset(Some(200)), 200);
    }

    #[test]
    fn test_scope_where_numbers_binds_in_order() {
        let scope = IssueScope {
            district_id: Some(1),
            district_name: Some("Hassan".to_string()),
            status: Some("submitted".to_string()),
            ..Default::default()
        };
        let (clause, next_idx) = scope_where(&scope);
        assert_eq!(
            clause,
            "WHERE (district_id = $1 OR district_name = $2) AND status = $3"
        );
        assert_eq!(next_idx, 4);
    }

    #[test]
    fn test_scope_where_empty_scope_has_no_clause() {
        let (clause, next_idx) = scope_where(&IssueScope::default());
        assert!(clause.is_empty());
        assert_eq!(next_idx, 1);
    }
}
