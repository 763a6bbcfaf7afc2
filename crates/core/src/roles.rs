//! Authority role constants and validation.
//!
//! Roles form a jurisdiction ladder: a Village Incharge acts within a
//! single village, a PDO within a panchayat, a DDO across a district.
//! Villagers can report issues but perform no lifecycle transitions.

use crate::error::CoreError;

/// Reports issues; performs no transitions.
pub const ROLE_VILLAGER: &str = "villager";

/// Village Incharge: verifies, assigns, and resolves within a village.
pub const ROLE_VILLAGE_INCHARGE: &str = "village_incharge";

/// Panchayat Development Officer: everything a VI does, plus closing.
pub const ROLE_PDO: &str = "pdo";

/// District Development Officer: full authority across the district.
pub const ROLE_DDO: &str = "ddo";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_VILLAGER, ROLE_VILLAGE_INCHARGE, ROLE_PDO, ROLE_DDO];

/// Roles allowed to perform lifecycle transitions at all.
pub const AUTHORITY_ROLES: &[&str] = &[ROLE_VILLAGE_INCHARGE, ROLE_PDO, ROLE_DDO];

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        )))
    }
}

/// Returns `true` if the role may perform lifecycle transitions.
pub fn is_authority(role: &str) -> bool {
    AUTHORITY_ROLES.contains(&role)
}
