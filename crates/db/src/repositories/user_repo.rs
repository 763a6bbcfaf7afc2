//! Repository for the `users` table.

use gramsetu_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::UserRow;

const COLUMNS: &str =
    "id, name, phone, password_hash, role, district_id, panchayat_id, village_id, created_at";

/// Provides lookup and creation for user accounts.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by login phone number.
    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE phone = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a user. Used by account provisioning and test fixtures.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        name: &str,
        phone: &str,
        password_hash: &str,
        role: &str,
        district_id: Option<DbId>,
        panchayat_id: Option<DbId>,
        village_id: Option<DbId>,
    ) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, phone, password_hash, role, district_id, panchayat_id, village_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(name)
            .bind(phone)
            .bind(password_hash)
            .bind(role)
            .bind(district_id)
            .bind(panchayat_id)
            .bind(village_id)
            .fetch_one(pool)
            .await
    }
}
