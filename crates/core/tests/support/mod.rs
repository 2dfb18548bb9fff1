//! In-memory port implementations shared by the engine tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dealsync_core::sync::ports::{
    AccountRepository, ContactRepository, CrmClient, OpportunityRepository, RemoteQuery,
    SyncBacklog, UserRepository,
};
use dealsync_domain::{
    Account, BacklogEntry, Contact, DealSyncError, EntityKind, Opportunity, RemoteFieldError,
    Result, SfAccount, SfAccountPatch, SfContact, SfContactPatch, SfOpportunity,
    SfOpportunityPatch, SfUser, User,
};

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Configurable in-memory stand-in for the Salesforce client.
#[derive(Default)]
pub struct MockCrm {
    pub remote_users: Vec<SfUser>,
    pub remote_accounts: Vec<SfAccount>,
    pub remote_contacts: Vec<SfContact>,
    pub remote_opportunities: Vec<SfOpportunity>,

    /// Fail `query_users` with an authentication error.
    pub fail_users_auth: bool,
    /// Fail `query_accounts` with a network error.
    pub fail_account_query: bool,
    /// Reject every create with a field-level validation error.
    pub reject_creates: bool,
    /// Remote IDs whose update is rejected with a validation error.
    pub reject_update_ids: HashSet<String>,

    pub next_id: AtomicUsize,
    pub created: Mutex<Vec<String>>,
    pub updated: Mutex<Vec<String>>,
}

impl MockCrm {
    fn assign_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}{n:015}")
    }

    fn rejection() -> DealSyncError {
        DealSyncError::RemoteRejected {
            errors: vec![RemoteFieldError {
                error_code: "FIELD_CUSTOM_VALIDATION_EXCEPTION".to_string(),
                message: "rejected by org rule".to_string(),
                fields: vec!["Name".to_string()],
            }],
        }
    }

    fn create(&self, prefix: &str) -> Result<String> {
        if self.reject_creates {
            return Err(Self::rejection());
        }
        let id = self.assign_id(prefix);
        self.created.lock().unwrap().push(id.clone());
        Ok(id)
    }

    fn update(&self, id: &str) -> Result<()> {
        if self.reject_update_ids.contains(id) {
            return Err(Self::rejection());
        }
        self.updated.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[async_trait]
impl CrmClient for MockCrm {
    async fn query_users(&self) -> Result<Vec<SfUser>> {
        if self.fail_users_auth {
            return Err(DealSyncError::Auth("refresh token exchange failed".into()));
        }
        Ok(self.remote_users.clone())
    }

    async fn query_accounts(&self, _filter: &RemoteQuery) -> Result<Vec<SfAccount>> {
        if self.fail_account_query {
            return Err(DealSyncError::Network("connection reset".into()));
        }
        Ok(self.remote_accounts.clone())
    }

    async fn get_account(&self, id: &str) -> Result<Option<SfAccount>> {
        Ok(self.remote_accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn create_account(&self, _fields: &SfAccountPatch) -> Result<String> {
        self.create("001")
    }

    async fn update_account(&self, id: &str, _fields: &SfAccountPatch) -> Result<()> {
        self.update(id)
    }

    async fn query_contacts(&self, _filter: &RemoteQuery) -> Result<Vec<SfContact>> {
        Ok(self.remote_contacts.clone())
    }

    async fn get_contact(&self, id: &str) -> Result<Option<SfContact>> {
        Ok(self.remote_contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn create_contact(&self, _fields: &SfContactPatch) -> Result<String> {
        self.create("003")
    }

    async fn update_contact(&self, id: &str, _fields: &SfContactPatch) -> Result<()> {
        self.update(id)
    }

    async fn query_opportunities(&self, _filter: &RemoteQuery) -> Result<Vec<SfOpportunity>> {
        Ok(self.remote_opportunities.clone())
    }

    async fn get_opportunity(&self, id: &str) -> Result<Option<SfOpportunity>> {
        Ok(self.remote_opportunities.iter().find(|o| o.id == id).cloned())
    }

    async fn create_opportunity(&self, _fields: &SfOpportunityPatch) -> Result<String> {
        self.create("006")
    }

    async fn update_opportunity(&self, id: &str, _fields: &SfOpportunityPatch) -> Result<()> {
        self.update(id)
    }
}

fn is_dirty(
    salesforce_id: Option<&str>,
    updated_at: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
) -> bool {
    salesforce_id.is_none() || last_synced_at.map_or(true, |synced| updated_at > synced)
}

/// In-memory account store.
#[derive(Default)]
pub struct MemAccounts {
    pub rows: Mutex<Vec<Account>>,
    /// Account names whose insert fails (per-record failure injection).
    pub fail_insert_names: HashSet<String>,
}

impl MemAccounts {
    pub fn with_rows(rows: Vec<Account>) -> Self {
        Self { rows: Mutex::new(rows), ..Default::default() }
    }

    pub fn get(&self, id: &str) -> Option<Account> {
        self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl AccountRepository for MemAccounts {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Account>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.org_id == org_id && a.salesforce_id.is_some())
            .cloned()
            .collect())
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Account>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.org_id == org_id
                    && is_dirty(a.salesforce_id.as_deref(), a.updated_at, a.last_synced_at)
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.get(id))
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        if self.fail_insert_names.contains(&account.name) {
            return Err(DealSyncError::Database("disk I/O error".into()));
        }
        self.rows.lock().unwrap().push(account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|a| a.id == account.id) {
            Some(row) => {
                *row = account.clone();
                Ok(())
            }
            None => Err(DealSyncError::NotFound(format!("account {}", account.id))),
        }
    }
}

/// In-memory contact store.
#[derive(Default)]
pub struct MemContacts {
    pub rows: Mutex<Vec<Contact>>,
}

impl MemContacts {
    pub fn with_rows(rows: Vec<Contact>) -> Self {
        Self { rows: Mutex::new(rows) }
    }

    pub fn get(&self, id: &str) -> Option<Contact> {
        self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ContactRepository for MemContacts {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Contact>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.org_id == org_id && c.salesforce_id.is_some())
            .cloned()
            .collect())
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Contact>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| {
                c.org_id == org_id
                    && is_dirty(c.salesforce_id.as_deref(), c.updated_at, c.last_synced_at)
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Contact>> {
        Ok(self.get(id))
    }

    async fn insert(&self, contact: &Contact) -> Result<()> {
        self.rows.lock().unwrap().push(contact.clone());
        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| c.id == contact.id) {
            Some(row) => {
                *row = contact.clone();
                Ok(())
            }
            None => Err(DealSyncError::NotFound(format!("contact {}", contact.id))),
        }
    }
}

/// In-memory opportunity store.
#[derive(Default)]
pub struct MemOpportunities {
    pub rows: Mutex<Vec<Opportunity>>,
}

impl MemOpportunities {
    pub fn with_rows(rows: Vec<Opportunity>) -> Self {
        Self { rows: Mutex::new(rows) }
    }

    pub fn get(&self, id: &str) -> Option<Opportunity> {
        self.rows.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }
}

#[async_trait]
impl OpportunityRepository for MemOpportunities {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Opportunity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.org_id == org_id && o.salesforce_id.is_some())
            .cloned()
            .collect())
    }

    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Opportunity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| {
                o.org_id == org_id
                    && (is_dirty(o.salesforce_id.as_deref(), o.updated_at, o.last_synced_at)
                        || o.sync_status == dealsync_domain::OpportunitySyncStatus::PendingPush)
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Opportunity>> {
        Ok(self.get(id))
    }

    async fn insert(&self, opportunity: &Opportunity) -> Result<()> {
        self.rows.lock().unwrap().push(opportunity.clone());
        Ok(())
    }

    async fn update(&self, opportunity: &Opportunity) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|o| o.id == opportunity.id) {
            Some(row) => {
                *row = opportunity.clone();
                Ok(())
            }
            None => Err(DealSyncError::NotFound(format!("opportunity {}", opportunity.id))),
        }
    }
}

/// In-memory user store.
#[derive(Default)]
pub struct MemUsers {
    pub rows: Mutex<Vec<User>>,
}

impl MemUsers {
    pub fn with_rows(rows: Vec<User>) -> Self {
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait]
impl UserRepository for MemUsers {
    async fn list(&self, org_id: &str) -> Result<Vec<User>> {
        Ok(self.rows.lock().unwrap().iter().filter(|u| u.org_id == org_id).cloned().collect())
    }

    async fn set_salesforce_id(&self, user_id: &str, salesforce_id: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.salesforce_id = Some(salesforce_id.to_string());
                Ok(())
            }
            None => Err(DealSyncError::NotFound(format!("user {user_id}"))),
        }
    }
}

/// In-memory retry backlog.
#[derive(Default)]
pub struct MemBacklog {
    pub rows: Mutex<Vec<BacklogEntry>>,
}

impl MemBacklog {
    pub fn with_rows(rows: Vec<BacklogEntry>) -> Self {
        Self { rows: Mutex::new(rows) }
    }

    pub fn entries(&self) -> Vec<BacklogEntry> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncBacklog for MemBacklog {
    async fn enqueue(&self, entry: &BacklogEntry) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows
            .iter()
            .any(|e| e.org_id == entry.org_id && e.entity == entry.entity && e.record_id == entry.record_id)
        {
            rows.push(entry.clone());
        }
        Ok(())
    }

    async fn pending(
        &self,
        org_id: &str,
        entity: EntityKind,
        limit: usize,
    ) -> Result<Vec<BacklogEntry>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.org_id == org_id && e.entity == entity)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_resolved(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
    ) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .retain(|e| !(e.org_id == org_id && e.entity == entity && e.record_id == record_id));
        Ok(())
    }

    async fn mark_failed(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
        error: &str,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|e| e.org_id == org_id && e.entity == entity && e.record_id == record_id)
        {
            Some(entry) => {
                entry.attempts += 1;
                entry.last_error = Some(error.to_string());
            }
            None => rows.push(BacklogEntry {
                id: format!("bl-{entity}-{record_id}"),
                org_id: org_id.to_string(),
                entity,
                record_id: record_id.to_string(),
                attempts: 1,
                last_error: Some(error.to_string()),
                created_at: Utc::now(),
            }),
        }
        Ok(())
    }
}
