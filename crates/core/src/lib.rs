//! # DealSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Field mappers translating between local and Salesforce shapes
//! - ID resolvers bridging cross-system user/account identities
//! - The import and export engines and the sync runner
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `dealsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod sync;

// Re-export specific items to avoid ambiguity
pub use sync::ports::{
    AccountRepository, ContactRepository, CredentialStore, CrmClient, OpportunityRepository,
    OrgCredentials, RemoteQuery, SyncBacklog, UserRepository,
};
pub use sync::resolvers::{AccountIdMap, UserIdMap};
pub use sync::runner::{SyncOptions, SyncRunner};
