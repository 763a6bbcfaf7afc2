//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does
//! not meet the minimum requirement. Route-level gating is coarse; the
//! lifecycle engine additionally gates individual transition targets.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gramsetu_core::error::CoreError;
use gramsetu_core::roles::{is_authority, ROLE_DDO};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires any authority role (VI, PDO, or DDO). Rejects villagers
/// with 403 Forbidden.
pub struct RequireAuthority(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuthority {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_authority(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Authority role required".into(),
            )));
        }
        Ok(RequireAuthority(user))
    }
}

/// Requires the `ddo` role. Rejects with 403 Forbidden otherwise.
pub struct RequireDdo(pub AuthUser);

impl FromRequestParts<AppState> for RequireDdo {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_DDO {
            return Err(AppError::Core(CoreError::Forbidden(
                "DDO role required".into(),
            )));
        }
        Ok(RequireDdo(user))
    }
}
