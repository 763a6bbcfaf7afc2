//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod fund_request_repo;
pub mod issue_repo;
pub mod message_repo;
pub mod progress_repo;
pub mod user_repo;

pub use fund_request_repo::FundRequestRepo;
pub use issue_repo::IssueRepo;
pub use message_repo::MessageRepo;
pub use progress_repo::ProgressRepo;
pub use user_repo::UserRepo;
