//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `gramsetu_db` and to the
//! pure engines in `gramsetu_core`, mapping errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod auth;
pub mod issues;
pub mod messages;
pub mod reports;
pub mod stats;
