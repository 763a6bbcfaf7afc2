//! Issue row model and DTOs.

use gramsetu_core::error::CoreError;
use gramsetu_core::issue::{AssignedWorker, Issue, IssueStatus, Location, Priority};
use gramsetu_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `issues` table. Status and priority are stored as
/// text constrained by CHECK clauses; conversion to the domain enums
/// happens in [`IssueRow::into_domain`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IssueRow {
    pub id: DbId,
    pub display_id: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub description: Option<String>,

    pub district_id: Option<DbId>,
    pub district_name: Option<String>,
    pub taluk_id: Option<DbId>,
    pub taluk_name: Option<String>,
    pub panchayat_id: Option<DbId>,
    pub panchayat_name: Option<String>,
    pub village_id: Option<DbId>,
    pub village_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,

    pub reporter_id: DbId,
    pub worker_name: Option<String>,
    pub worker_phone: Option<String>,
    pub worker_email: Option<String>,

    pub escalated: bool,
    pub rejection_reason: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolution_photo: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub verified_at: Option<Timestamp>,
    pub assigned_at: Option<Timestamp>,
    pub in_progress_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub escalated_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
}

impl IssueRow {
    /// Convert the row into the domain representation.
    ///
    /// Status and priority are constrained by the schema, so a parse
    /// failure here indicates a corrupted row and maps to `Internal`.
    pub fn into_domain(self) -> Result<Issue, CoreError> {
        let status = IssueStatus::parse(&self.status)
            .map_err(|_| CoreError::Internal(format!("corrupt issue status '{}'", self.status)))?;
        let priority = Priority::parse(&self.priority).map_err(|_| {
            CoreError::Internal(format!("corrupt issue priority '{}'", self.priority))
        })?;

        let assigned_worker = match (self.worker_name, self.worker_phone) {
            (Some(name), Some(phone)) => Some(AssignedWorker {
                name,
                phone,
                email: self.worker_email,
            }),
            _ => None,
        };

        Ok(Issue {
            id: self.id,
            display_id: self.display_id,
            category: self.category,
            priority,
            status,
            description: self.description,
            location: Location {
                district_id: self.district_id,
                district_name: self.district_name,
                taluk_id: self.taluk_id,
                taluk_name: self.taluk_name,
                panchayat_id: self.panchayat_id,
                panchayat_name: self.panchayat_name,
                village_id: self.village_id,
                village_name: self.village_name,
                latitude: self.latitude,
                longitude: self.longitude,
                address: self.address,
            },
            reporter_id: self.reporter_id,
            assigned_worker,
            escalated: self.escalated,
            rejection_reason: self.rejection_reason,
            resolution_notes: self.resolution_notes,
            resolution_photo: self.resolution_photo,
            created_at: self.created_at,
            updated_at: self.updated_at,
            verified_at: self.verified_at,
            assigned_at: self.assigned_at,
            in_progress_at: self.in_progress_at,
            resolved_at: self.resolved_at,
            escalated_at: self.escalated_at,
            rejected_at: self.rejected_at,
            closed_at: self.closed_at,
        })
    }
}

/// DTO for reporting a new issue.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIssue {
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    /// Defaults to `medium` when absent.
    pub priority: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,

    pub district_id: Option<DbId>,
    #[validate(length(max = 120))]
    pub district_name: Option<String>,
    pub taluk_id: Option<DbId>,
    #[validate(length(max = 120))]
    pub taluk_name: Option<String>,
    pub panchayat_id: Option<DbId>,
    #[validate(length(max = 120))]
    pub panchayat_name: Option<String>,
    pub village_id: Option<DbId>,
    #[validate(length(max = 120))]
    pub village_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Scope filter for issue listing and aggregation input.
///
/// When both a district id and a district name are supplied, rows
/// matching either are returned in a single de-duplicated query (the
/// legacy data carries some rows keyed only by name).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueScope {
    pub district_id: Option<DbId>,
    pub district_name: Option<String>,
    pub panchayat_id: Option<DbId>,
    pub panchayat_name: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
