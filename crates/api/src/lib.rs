//! HTTP API for the issue-tracking service.
//!
//! Thin layer over the pure engines in `gramsetu_core` and the
//! repositories in `gramsetu_db`: handlers authenticate, deserialize,
//! delegate, and map errors to JSON responses.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
