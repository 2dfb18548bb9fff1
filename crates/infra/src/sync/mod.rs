//! Sync wiring: the per-organization service factory.

mod service;

pub use service::SalesforceSyncService;
