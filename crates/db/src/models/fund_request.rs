//! Fund request row model. Rows are created by the PDO funding
//! workflow; this layer consumes them read-only for the display-status
//! overlay and reporting.

use gramsetu_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `fund_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FundRequestRow {
    pub id: DbId,
    pub issue_id: DbId,
    /// Requested amount in rupees.
    pub amount: f64,
    /// One of `pending`, `approved`, `rejected`.
    pub status: String,
    pub panchayat_id: Option<DbId>,
    pub district_id: Option<DbId>,
    pub created_at: Timestamp,
    pub approved_at: Option<Timestamp>,
}
