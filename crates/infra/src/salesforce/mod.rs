//! Salesforce REST adapter.
//!
//! `client` implements the `CrmClient` port over the Salesforce REST API,
//! `auth` handles refresh-token exchange against the OAuth token endpoint,
//! and `errors` classifies API failures into the domain taxonomy.

pub mod auth;
pub mod client;
pub mod errors;

pub use auth::TokenBroker;
pub use client::SalesforceClient;
pub use errors::SalesforceError;
