//! Row models and DTOs for the record store.

pub mod fund_request;
pub mod issue;
pub mod message;
pub mod progress;
pub mod user;
