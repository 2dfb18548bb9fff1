//! Export engine: push local changes out to the remote system.
//!
//! Mirrors the import engine's per-entity structure. Candidates are the
//! dirty records (no remote identity yet, or modified since the last sync)
//! merged with the entity's pending backlog entries; every failed push
//! lands in the backlog so retry behavior is uniform across entity types.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dealsync_domain::{
    Account, Contact, DealSyncError, EntityKind, EntityReport, Opportunity,
    OpportunitySyncStatus, Result,
};
use tracing::{debug, instrument, warn};

use super::mappers::{account, contact, opportunity};
use super::ports::{
    AccountRepository, ContactRepository, CrmClient, OpportunityRepository, SyncBacklog,
};
use super::resolvers::{AccountIdMap, UserIdMap};

/// Cap on backlog entries drained per entity per run.
const BACKLOG_DRAIN_LIMIT: usize = 100;

/// Pushes local changes to the remote system, one entity type per call.
pub struct ExportEngine {
    client: Arc<dyn CrmClient>,
    accounts: Arc<dyn AccountRepository>,
    contacts: Arc<dyn ContactRepository>,
    opportunities: Arc<dyn OpportunityRepository>,
    backlog: Arc<dyn SyncBacklog>,
}

impl ExportEngine {
    pub fn new(
        client: Arc<dyn CrmClient>,
        accounts: Arc<dyn AccountRepository>,
        contacts: Arc<dyn ContactRepository>,
        opportunities: Arc<dyn OpportunityRepository>,
        backlog: Arc<dyn SyncBacklog>,
    ) -> Self {
        Self { client, accounts, contacts, opportunities, backlog }
    }

    /// Export accounts, extending `account_map` with every identity the
    /// remote system assigns so dependent exports can resolve their keys.
    #[instrument(skip(self, users, account_map), fields(org_id))]
    pub async fn export_accounts(
        &self,
        org_id: &str,
        users: &UserIdMap,
        account_map: &mut AccountIdMap,
    ) -> Result<EntityReport> {
        let candidates = self.account_candidates(org_id).await?;
        let mut report = EntityReport::default();

        for mut record in candidates {
            let owner = users.salesforce_owner(record.owner_id.as_deref()).map(str::to_string);
            let patch = account::to_patch(&record, owner);
            let was_new = record.salesforce_id.is_none();

            let push = match &record.salesforce_id {
                Some(salesforce_id) => {
                    self.client.update_account(salesforce_id, &patch).await.map(|()| None)
                }
                None => self.client.create_account(&patch).await.map(Some),
            };

            match push {
                Ok(assigned_id) => {
                    if let Some(new_id) = assigned_id {
                        record.salesforce_id = Some(new_id);
                    }
                    if let Some(salesforce_id) = &record.salesforce_id {
                        account_map.insert(salesforce_id.clone(), record.id.clone());
                    }
                    record.last_synced_at = Some(Utc::now());

                    if let Err(e) = self.accounts.update(&record).await {
                        warn!(account_id = %record.id, error = %e, "post-export persist failed");
                        report.record_error(format!("account {}: {e}", record.id));
                        continue;
                    }

                    self.settle(org_id, EntityKind::Account, &record.id, &mut report).await;
                    if was_new {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!(account_id = %record.id, error = %e, "account export failed");
                    report.record_error(format!("account {}: {e}", record.id));
                    self.note_failure(org_id, EntityKind::Account, &record.id, &e).await;
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "account export finished"
        );

        Ok(report)
    }

    /// Export contacts. A contact referencing an account that has no
    /// remote counterpart yet is skipped, not errored; it becomes
    /// exportable once the account export assigns one.
    #[instrument(skip(self, account_map), fields(org_id))]
    pub async fn export_contacts(
        &self,
        org_id: &str,
        account_map: &AccountIdMap,
    ) -> Result<EntityReport> {
        let candidates = self.contact_candidates(org_id).await?;
        let mut report = EntityReport::default();

        for mut record in candidates {
            let remote_account = match record.account_id.as_deref() {
                Some(local_account_id) => match account_map.salesforce_id(local_account_id) {
                    Some(salesforce_id) => Some(salesforce_id.to_string()),
                    None => {
                        debug!(
                            contact_id = %record.id,
                            account_id = %local_account_id,
                            "contact account has no remote counterpart, skipping"
                        );
                        report.skipped += 1;
                        continue;
                    }
                },
                None => None,
            };

            let patch = contact::to_patch(&record, remote_account);
            let was_new = record.salesforce_id.is_none();

            let push = match &record.salesforce_id {
                Some(salesforce_id) => {
                    self.client.update_contact(salesforce_id, &patch).await.map(|()| None)
                }
                None => self.client.create_contact(&patch).await.map(Some),
            };

            match push {
                Ok(assigned_id) => {
                    if let Some(new_id) = assigned_id {
                        record.salesforce_id = Some(new_id);
                    }
                    record.last_synced_at = Some(Utc::now());

                    if let Err(e) = self.contacts.update(&record).await {
                        warn!(contact_id = %record.id, error = %e, "post-export persist failed");
                        report.record_error(format!("contact {}: {e}", record.id));
                        continue;
                    }

                    self.settle(org_id, EntityKind::Contact, &record.id, &mut report).await;
                    if was_new {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!(contact_id = %record.id, error = %e, "contact export failed");
                    report.record_error(format!("contact {}: {e}", record.id));
                    self.note_failure(org_id, EntityKind::Contact, &record.id, &e).await;
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "contact export finished"
        );

        Ok(report)
    }

    /// Export opportunities. Failed pushes mark the record `pending_push`
    /// in addition to the shared backlog entry.
    #[instrument(skip(self, users, account_map), fields(org_id))]
    pub async fn export_opportunities(
        &self,
        org_id: &str,
        users: &UserIdMap,
        account_map: &AccountIdMap,
    ) -> Result<EntityReport> {
        let candidates = self.opportunity_candidates(org_id).await?;
        let mut report = EntityReport::default();

        for mut record in candidates {
            let Some(remote_account) =
                account_map.salesforce_id(&record.account_id).map(str::to_string)
            else {
                debug!(
                    opportunity_id = %record.id,
                    account_id = %record.account_id,
                    "opportunity account has no remote counterpart, skipping"
                );
                report.skipped += 1;
                continue;
            };

            let owner = users.salesforce_owner(record.owner_id.as_deref()).map(str::to_string);
            let patch = opportunity::to_patch(&record, owner, remote_account);
            let was_new = record.salesforce_id.is_none();

            let push = match &record.salesforce_id {
                Some(salesforce_id) => {
                    self.client.update_opportunity(salesforce_id, &patch).await.map(|()| None)
                }
                None => self.client.create_opportunity(&patch).await.map(Some),
            };

            match push {
                Ok(assigned_id) => {
                    if let Some(new_id) = assigned_id {
                        record.salesforce_id = Some(new_id);
                    }
                    record.last_synced_at = Some(Utc::now());
                    record.sync_status = OpportunitySyncStatus::Synced;

                    if let Err(e) = self.opportunities.update(&record).await {
                        warn!(opportunity_id = %record.id, error = %e, "post-export persist failed");
                        report.record_error(format!("opportunity {}: {e}", record.id));
                        continue;
                    }

                    self.settle(org_id, EntityKind::Opportunity, &record.id, &mut report).await;
                    if was_new {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!(opportunity_id = %record.id, error = %e, "opportunity export failed");
                    report.record_error(format!("opportunity {}: {e}", record.id));

                    record.sync_status = OpportunitySyncStatus::PendingPush;
                    if let Err(persist_err) = self.opportunities.update(&record).await {
                        warn!(
                            opportunity_id = %record.id,
                            error = %persist_err,
                            "failed to flag opportunity pending_push"
                        );
                    }
                    self.note_failure(org_id, EntityKind::Opportunity, &record.id, &e).await;
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "opportunity export finished"
        );

        Ok(report)
    }

    async fn account_candidates(&self, org_id: &str) -> Result<Vec<Account>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for entry in
            self.backlog.pending(org_id, EntityKind::Account, BACKLOG_DRAIN_LIMIT).await?
        {
            match self.accounts.find_by_id(&entry.record_id).await? {
                Some(record) if seen.insert(record.id.clone()) => candidates.push(record),
                Some(_) => {}
                None => {
                    // Record vanished since it was queued; nothing left to push.
                    self.backlog
                        .mark_resolved(org_id, EntityKind::Account, &entry.record_id)
                        .await?;
                }
            }
        }

        for record in self.accounts.find_dirty(org_id).await? {
            if seen.insert(record.id.clone()) {
                candidates.push(record);
            }
        }

        Ok(candidates)
    }

    async fn contact_candidates(&self, org_id: &str) -> Result<Vec<Contact>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for entry in
            self.backlog.pending(org_id, EntityKind::Contact, BACKLOG_DRAIN_LIMIT).await?
        {
            match self.contacts.find_by_id(&entry.record_id).await? {
                Some(record) if seen.insert(record.id.clone()) => candidates.push(record),
                Some(_) => {}
                None => {
                    self.backlog
                        .mark_resolved(org_id, EntityKind::Contact, &entry.record_id)
                        .await?;
                }
            }
        }

        for record in self.contacts.find_dirty(org_id).await? {
            if seen.insert(record.id.clone()) {
                candidates.push(record);
            }
        }

        Ok(candidates)
    }

    async fn opportunity_candidates(&self, org_id: &str) -> Result<Vec<Opportunity>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for entry in
            self.backlog.pending(org_id, EntityKind::Opportunity, BACKLOG_DRAIN_LIMIT).await?
        {
            match self.opportunities.find_by_id(&entry.record_id).await? {
                Some(record) if seen.insert(record.id.clone()) => candidates.push(record),
                Some(_) => {}
                None => {
                    self.backlog
                        .mark_resolved(org_id, EntityKind::Opportunity, &entry.record_id)
                        .await?;
                }
            }
        }

        for record in self.opportunities.find_dirty(org_id).await? {
            if seen.insert(record.id.clone()) {
                candidates.push(record);
            }
        }

        Ok(candidates)
    }

    /// Clear any backlog entry after a successful push. Failure here is
    /// bookkeeping, not a lost record, so it is reported but not fatal.
    async fn settle(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
        report: &mut EntityReport,
    ) {
        if let Err(e) = self.backlog.mark_resolved(org_id, entity, record_id).await {
            warn!(entity = %entity, record_id, error = %e, "backlog resolve failed");
            report.record_error(format!("{entity} {record_id}: backlog resolve: {e}"));
        }
    }

    async fn note_failure(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
        error: &DealSyncError,
    ) {
        if let Err(e) =
            self.backlog.mark_failed(org_id, entity, record_id, &error.to_string()).await
        {
            warn!(entity = %entity, record_id, error = %e, "backlog enqueue failed");
        }
    }
}

/// Setup-class failures abort the run; everything else stays per-record.
fn is_fatal(error: &DealSyncError) -> bool {
    matches!(error, DealSyncError::Auth(_) | DealSyncError::Config(_))
}
