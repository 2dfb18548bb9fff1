//! Import engine: pull remote records into the local store.
//!
//! Runs one entity type at a time in dependency order. Each batch loads the
//! local records already correlated with the remote system, then walks the
//! remote result set applying the newer-wins rule: update in place only
//! when the remote copy is strictly newer, create when no local match
//! exists. A single record's failure is logged, counted, and never aborts
//! the batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dealsync_domain::{Account, Contact, EntityReport, Opportunity, Result};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::mappers::{account, contact, opportunity};
use super::ports::{
    AccountRepository, ContactRepository, CrmClient, OpportunityRepository, RemoteQuery,
};
use super::resolvers::{AccountIdMap, UserIdMap};

/// Pulls remote changes into the local store, one entity type per call.
pub struct ImportEngine {
    client: Arc<dyn CrmClient>,
    accounts: Arc<dyn AccountRepository>,
    contacts: Arc<dyn ContactRepository>,
    opportunities: Arc<dyn OpportunityRepository>,
}

impl ImportEngine {
    pub fn new(
        client: Arc<dyn CrmClient>,
        accounts: Arc<dyn AccountRepository>,
        contacts: Arc<dyn ContactRepository>,
        opportunities: Arc<dyn OpportunityRepository>,
    ) -> Self {
        Self { client, accounts, contacts, opportunities }
    }

    /// Import remote accounts, extending `account_map` with every record
    /// created or matched so the dependent entity steps can resolve their
    /// foreign keys.
    #[instrument(skip(self, users, account_map, query), fields(org_id))]
    pub async fn import_accounts(
        &self,
        org_id: &str,
        users: &UserIdMap,
        account_map: &mut AccountIdMap,
        query: &RemoteQuery,
    ) -> Result<EntityReport> {
        let remote_accounts = self.client.query_accounts(query).await?;
        let local = self.accounts.find_synced(org_id).await?;

        for account in &local {
            if let Some(salesforce_id) = &account.salesforce_id {
                account_map.insert(salesforce_id.clone(), account.id.clone());
            }
        }

        let mut by_salesforce_id: HashMap<String, Account> = local
            .into_iter()
            .filter_map(|a| a.salesforce_id.clone().map(|sf| (sf, a)))
            .collect();

        let mut report = EntityReport::default();

        for remote in remote_accounts {
            let owner = users
                .local_owner(remote.owner_id.as_deref())
                .to_string();

            match by_salesforce_id.remove(&remote.id) {
                Some(mut existing) => {
                    if !account::is_remote_newer(&remote, &existing) {
                        debug!(salesforce_id = %remote.id, "local account is current, skipping");
                        report.skipped += 1;
                        continue;
                    }

                    account::apply_remote(&mut existing, &remote, Some(owner), Utc::now());
                    match self.accounts.update(&existing).await {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "account update failed");
                            report.record_error(format!("account {}: {e}", remote.id));
                        }
                    }
                }
                None => {
                    let created = account::from_remote(
                        &remote,
                        Uuid::now_v7().to_string(),
                        org_id.to_string(),
                        Some(owner),
                        Utc::now(),
                    );
                    match self.accounts.insert(&created).await {
                        Ok(()) => {
                            account_map.insert(remote.id.clone(), created.id.clone());
                            report.created += 1;
                        }
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "account insert failed");
                            report.record_error(format!("account {}: {e}", remote.id));
                        }
                    }
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "account import finished"
        );

        Ok(report)
    }

    /// Import remote contacts. A contact referencing an account with no
    /// local counterpart is skipped, not created with a dangling reference;
    /// it becomes importable once the account lands.
    #[instrument(skip(self, account_map, query), fields(org_id))]
    pub async fn import_contacts(
        &self,
        org_id: &str,
        account_map: &AccountIdMap,
        query: &RemoteQuery,
    ) -> Result<EntityReport> {
        let remote_contacts = self.client.query_contacts(query).await?;
        let mut by_salesforce_id: HashMap<String, Contact> = self
            .contacts
            .find_synced(org_id)
            .await?
            .into_iter()
            .filter_map(|c| c.salesforce_id.clone().map(|sf| (sf, c)))
            .collect();

        let mut report = EntityReport::default();

        for remote in remote_contacts {
            // Resolve the account reference up front; an orphan contact
            // (no remote account) stays an orphan locally.
            let local_account = match remote.account_id.as_deref() {
                Some(remote_account_id) => match account_map.local_id(remote_account_id) {
                    Some(local_id) => Some(local_id.to_string()),
                    None => {
                        debug!(
                            salesforce_id = %remote.id,
                            account = %remote_account_id,
                            "contact account not yet imported, skipping"
                        );
                        report.skipped += 1;
                        continue;
                    }
                },
                None => None,
            };

            match by_salesforce_id.remove(&remote.id) {
                Some(mut existing) => {
                    if !contact::is_remote_newer(&remote, &existing) {
                        report.skipped += 1;
                        continue;
                    }

                    contact::apply_remote(&mut existing, &remote, local_account, Utc::now());
                    match self.contacts.update(&existing).await {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "contact update failed");
                            report.record_error(format!("contact {}: {e}", remote.id));
                        }
                    }
                }
                None => {
                    let created = contact::from_remote(
                        &remote,
                        Uuid::now_v7().to_string(),
                        org_id.to_string(),
                        local_account,
                        Utc::now(),
                    );
                    match self.contacts.insert(&created).await {
                        Ok(()) => report.created += 1,
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "contact insert failed");
                            report.record_error(format!("contact {}: {e}", remote.id));
                        }
                    }
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "contact import finished"
        );

        Ok(report)
    }

    /// Import remote opportunities. Owners fall back to the designated
    /// default owner; an opportunity whose account is missing locally is
    /// skipped like a dependent contact.
    #[instrument(skip(self, users, account_map, query), fields(org_id))]
    pub async fn import_opportunities(
        &self,
        org_id: &str,
        users: &UserIdMap,
        account_map: &AccountIdMap,
        query: &RemoteQuery,
    ) -> Result<EntityReport> {
        let remote_opportunities = self.client.query_opportunities(query).await?;
        let mut by_salesforce_id: HashMap<String, Opportunity> = self
            .opportunities
            .find_synced(org_id)
            .await?
            .into_iter()
            .filter_map(|o| o.salesforce_id.clone().map(|sf| (sf, o)))
            .collect();

        let mut report = EntityReport::default();

        for remote in remote_opportunities {
            let local_account = match remote.account_id.as_deref() {
                Some(remote_account_id) => match account_map.local_id(remote_account_id) {
                    Some(local_id) => local_id.to_string(),
                    None => {
                        debug!(
                            salesforce_id = %remote.id,
                            account = %remote_account_id,
                            "opportunity account not yet imported, skipping"
                        );
                        report.skipped += 1;
                        continue;
                    }
                },
                None => {
                    debug!(salesforce_id = %remote.id, "opportunity has no account, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            let owner = users.local_owner(remote.owner_id.as_deref()).to_string();

            match by_salesforce_id.remove(&remote.id) {
                Some(mut existing) => {
                    if !opportunity::is_remote_newer(&remote, &existing) {
                        report.skipped += 1;
                        continue;
                    }

                    opportunity::apply_remote(&mut existing, &remote, Some(owner), Utc::now());
                    match self.opportunities.update(&existing).await {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "opportunity update failed");
                            report.record_error(format!("opportunity {}: {e}", remote.id));
                        }
                    }
                }
                None => {
                    let created = opportunity::from_remote(
                        &remote,
                        Uuid::now_v7().to_string(),
                        org_id.to_string(),
                        owner,
                        local_account,
                        Utc::now(),
                    );
                    match self.opportunities.insert(&created).await {
                        Ok(()) => report.created += 1,
                        Err(e) => {
                            warn!(salesforce_id = %remote.id, error = %e, "opportunity insert failed");
                            report.record_error(format!("opportunity {}: {e}", remote.id));
                        }
                    }
                }
            }
        }

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "opportunity import finished"
        );

        Ok(report)
    }
}
