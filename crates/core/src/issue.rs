//! Issue entity model: statuses, priorities, the fund-request overlay,
//! and the domain representation passed to the lifecycle and aggregation
//! engines.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Lifecycle status
// ---------------------------------------------------------------------------

/// Lifecycle status of an issue. Exactly one value holds at any time;
/// the append-only progress log is the authoritative history and the
/// status field is its current tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Reported by a villager; awaiting verification.
    Submitted,
    /// Verified on the ground by an authority.
    Verified,
    /// A field worker has been assigned.
    Assigned,
    /// Work is underway.
    InProgress,
    /// Work finished; awaiting closure.
    Resolved,
    /// Handed off to a higher authority level.
    Escalated,
    /// Rejected with a reason. Terminal.
    Rejected,
    /// Confirmed done. Terminal.
    Closed,
}

impl IssueStatus {
    /// Wire / database string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }

    /// Parse the wire form back into a status.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "verified" => Ok(Self::Verified),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            other => Err(CoreError::Validation(format!(
                "Invalid issue status '{other}'"
            ))),
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Verified => "Verified",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Escalated => "Escalated",
            Self::Rejected => "Rejected",
            Self::Closed => "Closed",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Counts as resolved for aggregation purposes.
    pub fn is_resolved_like(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Counts as pending for aggregation purposes.
    pub fn is_pending_like(self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Verified | Self::Assigned | Self::InProgress
        )
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Reporter-facing priority of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(CoreError::Validation(format!(
                "Invalid priority '{other}'. Must be one of: low, medium, high, urgent"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Fund-request overlay
// ---------------------------------------------------------------------------

/// Status of an associated fund request. Created by the PDO funding
/// workflow; consumed read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Pending,
    Approved,
    Rejected,
}

impl FundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid fund request status '{other}'"
            ))),
        }
    }
}

/// Derived display status: a pending or approved fund request overlays
/// the base lifecycle status on listing surfaces. The overlay is
/// informative only and never replaces the underlying status.
pub fn display_status(status: IssueStatus, fund: Option<FundStatus>) -> &'static str {
    match fund {
        Some(FundStatus::Pending) => "fund_requested",
        Some(FundStatus::Approved) => "funded",
        _ => status.as_str(),
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// Worker assigned to carry out the fix. Name and phone are mandatory
/// at assignment time; email is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedWorker {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Jurisdiction an issue belongs to. Ids are the canonical keys; names
/// are denormalized for display and for legacy name-based queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
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
}

/// Domain representation of an issue record.
///
/// Stage timestamps are each set exactly once, when the corresponding
/// transition first occurs; stages not yet reached carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: DbId,
    pub display_id: String,
    pub category: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub description: Option<String>,
    pub location: Location,
    pub reporter_id: DbId,
    pub assigned_worker: Option<AssignedWorker>,

    /// Independent of `status`: stays set even after the issue moves on.
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

impl Issue {
    /// Stage timestamp recorded for the given status, if that stage has
    /// been reached. `Submitted` maps to `created_at`.
    pub fn stage_timestamp(&self, status: IssueStatus) -> Option<Timestamp> {
        match status {
            IssueStatus::Submitted => Some(self.created_at),
            IssueStatus::Verified => self.verified_at,
            IssueStatus::Assigned => self.assigned_at,
            IssueStatus::InProgress => self.in_progress_at,
            IssueStatus::Resolved => self.resolved_at,
            IssueStatus::Escalated => self.escalated_at,
            IssueStatus::Rejected => self.rejected_at,
            IssueStatus::Closed => self.closed_at,
        }
    }
}

/// Generate a short human-facing display id, e.g. `GS-7F3A2C`.
pub fn new_display_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("GS-{}", raw[..6].to_uppercase())
}
