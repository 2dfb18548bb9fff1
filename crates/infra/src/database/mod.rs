//! SQLite persistence layer: the pooled manager plus one repository per
//! core port.

mod account_repository;
mod backlog_repository;
mod contact_repository;
mod credential_repository;
mod manager;
mod opportunity_repository;
mod user_repository;

pub use account_repository::SqliteAccountRepository;
pub use backlog_repository::SqliteBacklogRepository;
pub use contact_repository::SqliteContactRepository;
pub use credential_repository::SqliteCredentialStore;
pub use manager::{DbConnection, DbManager};
pub use opportunity_repository::SqliteOpportunityRepository;
pub use user_repository::SqliteUserRepository;
