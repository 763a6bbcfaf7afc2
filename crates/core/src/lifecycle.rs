//! Issue lifecycle state machine.
//!
//! One explicit transition table shared by every role-specific caller,
//! replacing per-surface ad hoc checks. [`apply_transition`] validates the
//! requested edge, the acting role, and the payload, then returns the
//! updated issue together with the progress-log entry to append. No
//! mutation is performed on failure; persistence is the caller's job and
//! must use a conditional update on the previous status (see
//! `gramsetu_db::repositories::IssueRepo::transition_update`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::issue::{AssignedWorker, Issue, IssueStatus};
use crate::roles::{is_authority, ROLE_VILLAGE_INCHARGE};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Legal outgoing edges for each state.
///
/// `Escalated` is reachable from every non-terminal state; from
/// `Escalated` the receiving authority resumes the normal flow at
/// assignment or later. `Rejected` and `Closed` are terminal.
pub fn allowed_targets(from: IssueStatus) -> &'static [IssueStatus] {
    use IssueStatus::*;
    match from {
        Submitted => &[Verified, Escalated, Rejected],
        Verified => &[Assigned, Escalated, Rejected],
        Assigned => &[InProgress, Escalated],
        InProgress => &[Resolved, Escalated],
        Resolved => &[Closed, Escalated],
        Escalated => &[Assigned, InProgress, Resolved],
        Rejected | Closed => &[],
    }
}

/// Returns `true` if `from -> to` is a legal edge.
pub fn is_legal(from: IssueStatus, to: IssueStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Targets a role is permitted to drive, regardless of the current state.
///
/// A Village Incharge cannot close issues; closing is reserved for the
/// panchayat and district levels.
pub fn role_allows(role: &str, target: IssueStatus) -> bool {
    if !is_authority(role) {
        return false;
    }
    if target == IssueStatus::Closed {
        return role != ROLE_VILLAGE_INCHARGE;
    }
    true
}

// ---------------------------------------------------------------------------
// Transition inputs
// ---------------------------------------------------------------------------

/// The authenticated actor performing a transition. Passed explicitly
/// rather than read from ambient state.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: DbId,
    pub role: String,
}

/// Payload accompanying a transition request. Which fields are required
/// depends on the target status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionPayload {
    /// Free-text note recorded in the progress log. Required (non-empty)
    /// when resolving, where it doubles as the resolution notes.
    pub note: Option<String>,
    /// Reference to an uploaded photo. Required on resolve for roles
    /// configured in [`LifecycleConfig`].
    pub photo_ref: Option<String>,
    /// Worker to assign. Required when moving to `assigned`.
    pub worker: Option<AssignedWorker>,
    /// Reason for rejection (required) or escalation (optional).
    pub reason: Option<String>,
}

/// Tunable lifecycle policy.
///
/// The resolution-photo requirement differs by role: field-level officers
/// must attach proof, higher offices may resolve on paper evidence.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Roles for which `photo_ref` is mandatory on the resolve transition.
    pub photo_required_roles: Vec<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            photo_required_roles: vec![ROLE_VILLAGE_INCHARGE.to_string()],
        }
    }
}

impl LifecycleConfig {
    /// Whether the given role must attach a photo when resolving.
    pub fn photo_required_for(&self, role: &str) -> bool {
        self.photo_required_roles.iter().any(|r| r == role)
    }
}

// ---------------------------------------------------------------------------
// Transition output
// ---------------------------------------------------------------------------

/// One entry of the append-only progress log. The log is the
/// authoritative history of an issue; the status field is its tip.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEntry {
    pub status: IssueStatus,
    pub note: Option<String>,
    pub photo_ref: Option<String>,
    pub actor_id: DbId,
    pub actor_role: String,
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// apply_transition
// ---------------------------------------------------------------------------

/// Validate and apply a status transition.
///
/// On success, returns the updated issue (status, stage timestamp,
/// `updated_at`, and target-specific fields set) plus the progress-log
/// entry to append. On failure the input issue is untouched and nothing
/// must be persisted.
///
/// `now` is passed in so callers control the clock.
pub fn apply_transition(
    issue: &Issue,
    target: IssueStatus,
    payload: &TransitionPayload,
    actor: &Actor,
    config: &LifecycleConfig,
    now: Timestamp,
) -> Result<(Issue, ProgressEntry), CoreError> {
    if !is_legal(issue.status, target) {
        return Err(CoreError::InvalidTransition {
            from: issue.status,
            to: target,
        });
    }

    if !role_allows(&actor.role, target) {
        return Err(CoreError::Forbidden(format!(
            "Role '{}' may not move an issue to '{target}'",
            actor.role
        )));
    }

    validate_payload(target, payload, &actor.role, config)?;

    let mut updated = issue.clone();
    updated.status = target;
    updated.updated_at = Some(now);

    // Stage timestamps are set exactly once, on first entry to the stage.
    let stamp = |slot: &mut Option<Timestamp>| {
        if slot.is_none() {
            *slot = Some(now);
        }
    };

    let mut entry_note = payload.note.clone();

    match target {
        IssueStatus::Verified => stamp(&mut updated.verified_at),
        IssueStatus::Assigned => {
            stamp(&mut updated.assigned_at);
            updated.assigned_worker = payload.worker.clone();
        }
        IssueStatus::InProgress => stamp(&mut updated.in_progress_at),
        IssueStatus::Resolved => {
            stamp(&mut updated.resolved_at);
            updated.resolution_notes = payload.note.clone();
            if payload.photo_ref.is_some() {
                updated.resolution_photo = payload.photo_ref.clone();
            }
        }
        IssueStatus::Escalated => {
            stamp(&mut updated.escalated_at);
            updated.escalated = true;
            entry_note = payload.reason.clone().or_else(|| payload.note.clone());
        }
        IssueStatus::Rejected => {
            stamp(&mut updated.rejected_at);
            updated.rejection_reason = payload.reason.clone();
            entry_note = payload.reason.clone();
        }
        IssueStatus::Closed => stamp(&mut updated.closed_at),
        IssueStatus::Submitted => unreachable!("submitted is never a transition target"),
    }

    let entry = ProgressEntry {
        status: target,
        note: entry_note,
        photo_ref: payload.photo_ref.clone(),
        actor_id: actor.id,
        actor_role: actor.role.clone(),
        at: now,
    };

    Ok((updated, entry))
}

/// Per-target payload requirements. Checked before any field is touched.
fn validate_payload(
    target: IssueStatus,
    payload: &TransitionPayload,
    role: &str,
    config: &LifecycleConfig,
) -> Result<(), CoreError> {
    let non_empty = |s: &Option<String>| s.as_ref().is_some_and(|v| !v.trim().is_empty());

    match target {
        IssueStatus::Assigned => {
            let worker = payload.worker.as_ref().ok_or_else(|| {
                CoreError::Validation("Assignment requires a worker".to_string())
            })?;
            if worker.name.trim().is_empty() || worker.phone.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Assigned worker must have a name and a phone number".to_string(),
                ));
            }
        }
        IssueStatus::Resolved => {
            if !non_empty(&payload.note) {
                return Err(CoreError::Validation(
                    "Resolution requires non-empty notes".to_string(),
                ));
            }
            if config.photo_required_for(role) && !non_empty(&payload.photo_ref) {
                return Err(CoreError::Validation(
                    "Resolution requires a photo for this role".to_string(),
                ));
            }
        }
        IssueStatus::Rejected => {
            if !non_empty(&payload.reason) {
                return Err(CoreError::Validation(
                    "Rejection requires a non-empty reason".to_string(),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::issue::{Location, Priority};
    use crate::roles::{ROLE_DDO, ROLE_PDO, ROLE_VILLAGER};

    fn ts(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
    }

    fn issue_in(status: IssueStatus) -> Issue {
        Issue {
            id: 1,
            display_id: "GS-ABC123".to_string(),
            category: "Water".to_string(),
            priority: Priority::High,
            status,
            description: None,
            location: Location::default(),
            reporter_id: 7,
            assigned_worker: None,
            escalated: false,
            rejection_reason: None,
            resolution_notes: None,
            resolution_photo: None,
            created_at: ts(1),
            updated_at: Some(ts(1)),
            verified_at: None,
            assigned_at: None,
            in_progress_at: None,
            resolved_at: None,
            escalated_at: None,
            rejected_at: None,
            closed_at: None,
        }
    }

    fn vi() -> Actor {
        Actor {
            id: 42,
            role: ROLE_VILLAGE_INCHARGE.to_string(),
        }
    }

    fn pdo() -> Actor {
        Actor {
            id: 43,
            role: ROLE_PDO.to_string(),
        }
    }

    fn worker() -> AssignedWorker {
        AssignedWorker {
            name: "Ramesh".to_string(),
            phone: "9876543210".to_string(),
            email: None,
        }
    }

    #[test]
    fn test_happy_path_edges_are_legal() {
        assert!(is_legal(IssueStatus::Submitted, IssueStatus::Verified));
        assert!(is_legal(IssueStatus::Verified, IssueStatus::Assigned));
        assert!(is_legal(IssueStatus::Assigned, IssueStatus::InProgress));
        assert!(is_legal(IssueStatus::InProgress, IssueStatus::Resolved));
        assert!(is_legal(IssueStatus::Resolved, IssueStatus::Closed));
    }

    #[test]
    fn test_escalation_reachable_from_all_non_terminal_states() {
        for from in [
            IssueStatus::Submitted,
            IssueStatus::Verified,
            IssueStatus::Assigned,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
        ] {
            assert!(is_legal(from, IssueStatus::Escalated), "from {from}");
        }
        assert!(!is_legal(IssueStatus::Closed, IssueStatus::Escalated));
        assert!(!is_legal(IssueStatus::Rejected, IssueStatus::Escalated));
    }

    #[test]
    fn test_skipping_stages_is_illegal() {
        let issue = issue_in(IssueStatus::Submitted);
        let result = apply_transition(
            &issue,
            IssueStatus::Resolved,
            &TransitionPayload::default(),
            &pdo(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(
            result,
            Err(CoreError::InvalidTransition {
                from: IssueStatus::Submitted,
                to: IssueStatus::Resolved,
            })
        );
    }

    #[test]
    fn test_submitted_to_closed_is_illegal() {
        let issue = issue_in(IssueStatus::Submitted);
        let result = apply_transition(
            &issue,
            IssueStatus::Closed,
            &TransitionPayload::default(),
            &pdo(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for from in [IssueStatus::Closed, IssueStatus::Rejected] {
            assert!(allowed_targets(from).is_empty());
        }
    }

    #[test]
    fn test_failed_transition_leaves_issue_unmodified() {
        let issue = issue_in(IssueStatus::Submitted);
        let before = format!("{issue:?}");
        let _ = apply_transition(
            &issue,
            IssueStatus::Closed,
            &TransitionPayload::default(),
            &pdo(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_eq!(format!("{issue:?}"), before);
    }

    #[test]
    fn test_assignment_requires_worker() {
        let issue = issue_in(IssueStatus::Verified);
        let result = apply_transition(
            &issue,
            IssueStatus::Assigned,
            &TransitionPayload::default(),
            &vi(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_assignment_requires_worker_phone() {
        let issue = issue_in(IssueStatus::Verified);
        let payload = TransitionPayload {
            worker: Some(AssignedWorker {
                name: "Ramesh".to_string(),
                phone: "  ".to_string(),
                email: None,
            }),
            ..Default::default()
        };
        let result = apply_transition(
            &issue,
            IssueStatus::Assigned,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_assignment_sets_worker_and_timestamp() {
        let issue = issue_in(IssueStatus::Verified);
        let payload = TransitionPayload {
            worker: Some(worker()),
            ..Default::default()
        };
        let (updated, entry) = apply_transition(
            &issue,
            IssueStatus::Assigned,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(3),
        )
        .unwrap();
        assert_eq!(updated.status, IssueStatus::Assigned);
        assert_eq!(updated.assigned_worker, Some(worker()));
        assert_eq!(updated.assigned_at, Some(ts(3)));
        assert_eq!(updated.updated_at, Some(ts(3)));
        assert_eq!(entry.status, IssueStatus::Assigned);
        assert_eq!(entry.actor_id, 42);
    }

    #[test]
    fn test_worker_survives_in_progress_and_timestamps_order() {
        let issue = issue_in(IssueStatus::Verified);
        let payload = TransitionPayload {
            worker: Some(worker()),
            ..Default::default()
        };
        let (assigned, _) = apply_transition(
            &issue,
            IssueStatus::Assigned,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(3),
        )
        .unwrap();

        let (in_progress, _) = apply_transition(
            &assigned,
            IssueStatus::InProgress,
            &TransitionPayload::default(),
            &vi(),
            &LifecycleConfig::default(),
            ts(5),
        )
        .unwrap();

        assert_eq!(in_progress.assigned_worker, Some(worker()));
        assert!(in_progress.in_progress_at.unwrap() >= in_progress.assigned_at.unwrap());
    }

    #[test]
    fn test_resolve_requires_notes() {
        let issue = issue_in(IssueStatus::InProgress);
        let payload = TransitionPayload {
            photo_ref: Some("photos/1.jpg".to_string()),
            ..Default::default()
        };
        let result = apply_transition(
            &issue,
            IssueStatus::Resolved,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(6),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_resolve_photo_required_for_village_incharge() {
        let issue = issue_in(IssueStatus::InProgress);
        let payload = TransitionPayload {
            note: Some("Pipe replaced".to_string()),
            ..Default::default()
        };
        let result = apply_transition(
            &issue,
            IssueStatus::Resolved,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(6),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_resolve_photo_optional_for_pdo() {
        let issue = issue_in(IssueStatus::InProgress);
        let payload = TransitionPayload {
            note: Some("Pipe replaced".to_string()),
            ..Default::default()
        };
        let (updated, _) = apply_transition(
            &issue,
            IssueStatus::Resolved,
            &payload,
            &pdo(),
            &LifecycleConfig::default(),
            ts(6),
        )
        .unwrap();
        assert_eq!(updated.resolution_notes.as_deref(), Some("Pipe replaced"));
        assert_eq!(updated.resolved_at, Some(ts(6)));
    }

    #[test]
    fn test_rejection_requires_reason_and_is_limited_to_early_states() {
        let issue = issue_in(IssueStatus::Submitted);
        let result = apply_transition(
            &issue,
            IssueStatus::Rejected,
            &TransitionPayload::default(),
            &pdo(),
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));

        assert!(!is_legal(IssueStatus::Assigned, IssueStatus::Rejected));
        assert!(!is_legal(IssueStatus::InProgress, IssueStatus::Rejected));
    }

    #[test]
    fn test_rejection_records_reason() {
        let issue = issue_in(IssueStatus::Verified);
        let payload = TransitionPayload {
            reason: Some("Duplicate of GS-QQ1234".to_string()),
            ..Default::default()
        };
        let (updated, entry) = apply_transition(
            &issue,
            IssueStatus::Rejected,
            &payload,
            &pdo(),
            &LifecycleConfig::default(),
            ts(2),
        )
        .unwrap();
        assert_eq!(
            updated.rejection_reason.as_deref(),
            Some("Duplicate of GS-QQ1234")
        );
        assert_eq!(entry.note.as_deref(), Some("Duplicate of GS-QQ1234"));
        assert!(updated.status.is_terminal());
    }

    #[test]
    fn test_escalation_sets_flag_and_stamps_once() {
        let issue = issue_in(IssueStatus::Submitted);
        let (escalated, _) = apply_transition(
            &issue,
            IssueStatus::Escalated,
            &TransitionPayload::default(),
            &vi(),
            &LifecycleConfig::default(),
            ts(2),
        )
        .unwrap();
        assert!(escalated.escalated);
        assert_eq!(escalated.escalated_at, Some(ts(2)));

        // Resume the flow, then escalate again: the stage timestamp
        // keeps its first value.
        let payload = TransitionPayload {
            worker: Some(worker()),
            ..Default::default()
        };
        let (assigned, _) = apply_transition(
            &escalated,
            IssueStatus::Assigned,
            &payload,
            &pdo(),
            &LifecycleConfig::default(),
            ts(4),
        )
        .unwrap();
        let (re_escalated, _) = apply_transition(
            &assigned,
            IssueStatus::Escalated,
            &TransitionPayload::default(),
            &pdo(),
            &LifecycleConfig::default(),
            ts(8),
        )
        .unwrap();
        assert_eq!(re_escalated.escalated_at, Some(ts(2)));
    }

    #[test]
    fn test_village_incharge_cannot_close() {
        let issue = issue_in(IssueStatus::Resolved);
        let result = apply_transition(
            &issue,
            IssueStatus::Closed,
            &TransitionPayload::default(),
            &vi(),
            &LifecycleConfig::default(),
            ts(9),
        );
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn test_pdo_and_ddo_can_close_from_resolved() {
        for role in [ROLE_PDO, ROLE_DDO] {
            let issue = issue_in(IssueStatus::Resolved);
            let actor = Actor {
                id: 9,
                role: role.to_string(),
            };
            let (updated, _) = apply_transition(
                &issue,
                IssueStatus::Closed,
                &TransitionPayload::default(),
                &actor,
                &LifecycleConfig::default(),
                ts(9),
            )
            .unwrap();
            assert_eq!(updated.status, IssueStatus::Closed);
            assert_eq!(updated.closed_at, Some(ts(9)));
        }
    }

    #[test]
    fn test_villager_cannot_transition_at_all() {
        let issue = issue_in(IssueStatus::Submitted);
        let actor = Actor {
            id: 5,
            role: ROLE_VILLAGER.to_string(),
        };
        let result = apply_transition(
            &issue,
            IssueStatus::Verified,
            &TransitionPayload::default(),
            &actor,
            &LifecycleConfig::default(),
            ts(2),
        );
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn test_verification_note_lands_in_progress_entry() {
        let issue = issue_in(IssueStatus::Submitted);
        let payload = TransitionPayload {
            note: Some("Confirmed on site".to_string()),
            ..Default::default()
        };
        let (updated, entry) = apply_transition(
            &issue,
            IssueStatus::Verified,
            &payload,
            &vi(),
            &LifecycleConfig::default(),
            ts(2),
        )
        .unwrap();
        assert_eq!(updated.verified_at, Some(ts(2)));
        assert_eq!(entry.note.as_deref(), Some("Confirmed on site"));
        assert_eq!(entry.actor_role, ROLE_VILLAGE_INCHARGE);
    }

    #[test]
    fn test_photo_requirement_is_configurable() {
        let issue = issue_in(IssueStatus::InProgress);
        let payload = TransitionPayload {
            note: Some("Done".to_string()),
            ..Default::default()
        };
        // Empty requirement list: even a VI may resolve without a photo.
        let config = LifecycleConfig {
            photo_required_roles: vec![],
        };
        assert!(apply_transition(
            &issue,
            IssueStatus::Resolved,
            &payload,
            &vi(),
            &config,
            ts(6),
        )
        .is_ok());
    }
}
