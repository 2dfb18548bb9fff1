//! Bidirectional Salesforce synchronization.
//!
//! A sync run imports remote changes (accounts, then contacts, then
//! opportunities — later steps consume the ID maps the earlier steps
//! populate), then exports local changes in the same order. Conflicts
//! resolve newer-wins on last-modified timestamps; per-record failures are
//! reported in the run summary and never abort a batch.

pub mod export;
pub mod import;
pub mod mappers;
pub mod ports;
pub mod resolvers;
pub mod runner;
