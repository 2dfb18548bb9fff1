//! Per-organization sync service.
//!
//! The factory wires stored credentials, the Salesforce client, the SQLite
//! repositories, and the runner into one bounded-lifetime handle. A handle
//! is built per organization at the call site; there is no process-wide
//! client.

use std::sync::Arc;

use dealsync_core::sync::ports::{CredentialStore, CrmClient};
use dealsync_core::{SyncOptions, SyncRunner};
use dealsync_domain::{Config, DealSyncError, Result, SyncRunSummary};
use tracing::instrument;

use crate::database::{
    DbManager, SqliteAccountRepository, SqliteBacklogRepository, SqliteContactRepository,
    SqliteCredentialStore, SqliteOpportunityRepository, SqliteUserRepository,
};
use crate::salesforce::SalesforceClient;

/// One organization's sync capability.
pub struct SalesforceSyncService {
    org_id: String,
    runner: SyncRunner,
    client: Arc<SalesforceClient>,
}

impl std::fmt::Debug for SalesforceSyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceSyncService").field("org_id", &self.org_id).finish_non_exhaustive()
    }
}

impl SalesforceSyncService {
    /// Build the service for one organization.
    ///
    /// Fails with a configuration error before any network call when the
    /// organization has no stored Salesforce credentials.
    pub async fn for_org(org_id: &str, config: &Config, db: Arc<DbManager>) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(SqliteCredentialStore::new(Arc::clone(&db)));

        if credentials.get(org_id).await?.is_none() {
            return Err(DealSyncError::Config(format!(
                "organization {org_id} is not connected to Salesforce"
            )));
        }

        let client = Arc::new(SalesforceClient::new(
            &config.salesforce,
            Arc::clone(&credentials),
            org_id,
        )?);

        let crm_client: Arc<dyn CrmClient> = Arc::clone(&client) as Arc<dyn CrmClient>;
        let runner = SyncRunner::new(
            crm_client,
            Arc::new(SqliteUserRepository::new(Arc::clone(&db))),
            Arc::new(SqliteAccountRepository::new(Arc::clone(&db))),
            Arc::new(SqliteContactRepository::new(Arc::clone(&db))),
            Arc::new(SqliteOpportunityRepository::new(Arc::clone(&db))),
            Arc::new(SqliteBacklogRepository::new(db)),
        );

        Ok(Self { org_id: org_id.to_string(), runner, client })
    }

    /// Run a full bidirectional sync for this organization.
    #[instrument(skip(self, options), fields(org_id = %self.org_id))]
    pub async fn run(&self, options: &SyncOptions) -> Result<SyncRunSummary> {
        self.runner.run(&self.org_id, options).await
    }

    /// Borrow the underlying client (e.g. for a connectivity probe).
    pub fn client(&self) -> &SalesforceClient {
        &self.client
    }
}
