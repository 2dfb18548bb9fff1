//! Full bidirectional sync run for one organization.
//!
//! Sequencing is a hard requirement, not an optimization: accounts are
//! fully imported/exported before contacts, and contacts before
//! opportunities, because the later steps consume the ID maps the earlier
//! steps populate. The runner is sequential and single-threaded; callers
//! wanting parallelism invoke it for different organizations concurrently
//! and serialize runs per organization themselves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dealsync_domain::{
    DealSyncError, DirectionReport, EntityReport, Result, SyncRunSummary,
};
use tracing::{info, instrument, warn};

use super::export::ExportEngine;
use super::import::ImportEngine;
use super::ports::{
    AccountRepository, ContactRepository, CrmClient, OpportunityRepository, RemoteQuery,
    SyncBacklog, UserRepository,
};
use super::resolvers::{AccountIdMap, UserIdMap};

/// Options for one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Ignore `modified_since` and walk the full remote record set.
    pub full_resync: bool,
    /// Exclusive lower bound on remote modification time for incremental
    /// import.
    pub modified_since: Option<DateTime<Utc>>,
    /// Cap applied to each remote query.
    pub limit: Option<usize>,
}

/// Orchestrates import-then-export across all entity types.
pub struct SyncRunner {
    client: Arc<dyn CrmClient>,
    users: Arc<dyn UserRepository>,
    accounts: Arc<dyn AccountRepository>,
    contacts: Arc<dyn ContactRepository>,
    opportunities: Arc<dyn OpportunityRepository>,
    backlog: Arc<dyn SyncBacklog>,
}

impl SyncRunner {
    pub fn new(
        client: Arc<dyn CrmClient>,
        users: Arc<dyn UserRepository>,
        accounts: Arc<dyn AccountRepository>,
        contacts: Arc<dyn ContactRepository>,
        opportunities: Arc<dyn OpportunityRepository>,
        backlog: Arc<dyn SyncBacklog>,
    ) -> Self {
        Self { client, users, accounts, contacts, opportunities, backlog }
    }

    /// Run a full bidirectional sync.
    ///
    /// Only setup-class failures (configuration, authentication) propagate
    /// as errors; everything else completes the run and lands in the
    /// summary, so the caller always sees a success/partial report rather
    /// than a silent drop.
    #[instrument(skip(self, options), fields(org_id))]
    pub async fn run(&self, org_id: &str, options: &SyncOptions) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        info!(org_id, full_resync = options.full_resync, "starting sync run");

        let user_map = self.build_user_map(org_id).await?;

        let query = RemoteQuery {
            modified_since: if options.full_resync { None } else { options.modified_since },
            limit: options.limit,
        };

        let importer = ImportEngine::new(
            Arc::clone(&self.client),
            Arc::clone(&self.accounts),
            Arc::clone(&self.contacts),
            Arc::clone(&self.opportunities),
        );

        let mut account_map = AccountIdMap::default();
        let mut import = DirectionReport::default();

        absorb(
            importer.import_accounts(org_id, &user_map, &mut account_map, &query).await,
            &mut import.accounts,
            "account import",
        )?;
        absorb(
            importer.import_contacts(org_id, &account_map, &query).await,
            &mut import.contacts,
            "contact import",
        )?;
        absorb(
            importer.import_opportunities(org_id, &user_map, &account_map, &query).await,
            &mut import.opportunities,
            "opportunity import",
        )?;

        // Export works off a freshly rebuilt account map: the store is
        // authoritative once the import pass has landed.
        let mut account_map = AccountIdMap::from_accounts(&self.accounts.find_synced(org_id).await?);

        let exporter = ExportEngine::new(
            Arc::clone(&self.client),
            Arc::clone(&self.accounts),
            Arc::clone(&self.contacts),
            Arc::clone(&self.opportunities),
            Arc::clone(&self.backlog),
        );

        let mut export = DirectionReport::default();

        absorb(
            exporter.export_accounts(org_id, &user_map, &mut account_map).await,
            &mut export.accounts,
            "account export",
        )?;
        absorb(
            exporter.export_contacts(org_id, &account_map).await,
            &mut export.contacts,
            "contact export",
        )?;
        absorb(
            exporter.export_opportunities(org_id, &user_map, &account_map).await,
            &mut export.opportunities,
            "opportunity export",
        )?;

        let summary = SyncRunSummary {
            org_id: org_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            import,
            export,
        };

        info!(
            org_id,
            status = ?summary.status(),
            import_errors = summary.import.error_count(),
            export_errors = summary.export.error_count(),
            "sync run finished"
        );

        Ok(summary)
    }

    /// List remote and local users, join them, and persist any resolved
    /// Salesforce identity that changed (one write per changed user).
    async fn build_user_map(&self, org_id: &str) -> Result<UserIdMap> {
        let remote_users = self.client.query_users().await?;
        let local_users = self.users.list(org_id).await?;

        let (user_map, changed) = UserIdMap::build(&remote_users, &local_users)?;

        for user in changed {
            if let Some(salesforce_id) = &user.salesforce_id {
                if let Err(e) = self.users.set_salesforce_id(&user.id, salesforce_id).await {
                    warn!(user_id = %user.id, error = %e, "failed to persist user mapping");
                }
            }
        }

        Ok(user_map)
    }
}

/// Fold a step result into the run report. Setup-class errors propagate;
/// anything else (a failed remote query, a dead connection mid-batch) is
/// recorded against the step so the run still completes with a summary.
fn absorb(
    result: Result<EntityReport>,
    slot: &mut EntityReport,
    step: &str,
) -> Result<()> {
    match result {
        Ok(report) => {
            *slot = report;
            Ok(())
        }
        Err(err @ (DealSyncError::Auth(_) | DealSyncError::Config(_))) => Err(err),
        Err(err) => {
            warn!(step, error = %err, "sync step aborted");
            slot.record_error(format!("{step}: {err}"));
            Ok(())
        }
    }
}
