//! GramSetu domain core.
//!
//! Pure civic-issue domain logic shared by the DB and API layers:
//! the issue model, the lifecycle state machine, the aggregation engine,
//! and report projection. No I/O happens in this crate; every function
//! is a deterministic computation over values the caller supplies.

pub mod aggregation;
pub mod error;
pub mod issue;
pub mod lifecycle;
pub mod report;
pub mod roles;
pub mod types;
