//! User row model for the authentication collaborator.

use gramsetu_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
///
/// `password_hash` is a PHC-formatted Argon2id string and is never
/// serialized out.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: String,
    pub district_id: Option<DbId>,
    pub panchayat_id: Option<DbId>,
    pub village_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// Public view of a user, safe to return from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct UserPublic {
    pub id: DbId,
    pub name: String,
    pub phone: String,
    pub role: String,
}

impl From<&UserRow> for UserPublic {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            phone: row.phone.clone(),
            role: row.role.clone(),
        }
    }
}
