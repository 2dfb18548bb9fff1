//! Port interfaces for sync operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealsync_domain::{
    Account, BacklogEntry, Contact, EntityKind, Opportunity, Result, SfAccount, SfAccountPatch,
    SfContact, SfContactPatch, SfOpportunity, SfOpportunityPatch, SfUser, User,
};
use serde::{Deserialize, Serialize};

/// Filter for a remote query. Results are ordered by last-modified
/// descending; `modified_since` is an exclusive lower bound used for
/// incremental sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteQuery {
    pub modified_since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// OAuth credentials for one organization's Salesforce connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgCredentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Instance base URL, e.g. `https://acme.my.salesforce.com`.
    pub instance_url: String,
}

/// Typed client for the remote CRM API.
///
/// Token refresh is the adapter's concern; implementations retry a refresh
/// exactly once on an expired credential before surfacing an auth error.
/// A missing record on `get_*` is a normal outcome (`Ok(None)`), never an
/// error.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn query_users(&self) -> Result<Vec<SfUser>>;

    async fn query_accounts(&self, filter: &RemoteQuery) -> Result<Vec<SfAccount>>;
    async fn get_account(&self, id: &str) -> Result<Option<SfAccount>>;
    async fn create_account(&self, fields: &SfAccountPatch) -> Result<String>;
    async fn update_account(&self, id: &str, fields: &SfAccountPatch) -> Result<()>;

    async fn query_contacts(&self, filter: &RemoteQuery) -> Result<Vec<SfContact>>;
    async fn get_contact(&self, id: &str) -> Result<Option<SfContact>>;
    async fn create_contact(&self, fields: &SfContactPatch) -> Result<String>;
    async fn update_contact(&self, id: &str, fields: &SfContactPatch) -> Result<()>;

    async fn query_opportunities(&self, filter: &RemoteQuery) -> Result<Vec<SfOpportunity>>;
    async fn get_opportunity(&self, id: &str) -> Result<Option<SfOpportunity>>;
    async fn create_opportunity(&self, fields: &SfOpportunityPatch) -> Result<String>;
    async fn update_opportunity(&self, id: &str, fields: &SfOpportunityPatch) -> Result<()>;
}

/// Record store contract for accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// All accounts in the organization carrying a Salesforce identity.
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Account>>;

    /// Accounts needing export: no Salesforce identity yet, or modified
    /// since the last sync.
    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Account>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;
    async fn insert(&self, account: &Account) -> Result<()>;
    async fn update(&self, account: &Account) -> Result<()>;
}

/// Record store contract for contacts.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Contact>>;
    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Contact>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Contact>>;
    async fn insert(&self, contact: &Contact) -> Result<()>;
    async fn update(&self, contact: &Contact) -> Result<()>;
}

/// Record store contract for opportunities. `find_dirty` additionally
/// selects records flagged `pending_push`.
#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn find_synced(&self, org_id: &str) -> Result<Vec<Opportunity>>;
    async fn find_dirty(&self, org_id: &str) -> Result<Vec<Opportunity>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Opportunity>>;
    async fn insert(&self, opportunity: &Opportunity) -> Result<()>;
    async fn update(&self, opportunity: &Opportunity) -> Result<()>;
}

/// Read/write contract for local users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, org_id: &str) -> Result<Vec<User>>;

    /// Persist a resolved Salesforce identity (one write per changed user).
    async fn set_salesforce_id(&self, user_id: &str, salesforce_id: &str) -> Result<()>;
}

/// Opaque per-organization OAuth credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, org_id: &str) -> Result<Option<OrgCredentials>>;
    async fn put(&self, org_id: &str, credentials: &OrgCredentials) -> Result<()>;
}

/// Explicit retry queue for failed exports, shared by all entity types.
#[async_trait]
pub trait SyncBacklog: Send + Sync {
    /// Enqueue a record for re-export; a no-op when already queued.
    async fn enqueue(&self, entry: &BacklogEntry) -> Result<()>;

    /// Pending entries for one entity type, oldest first.
    async fn pending(&self, org_id: &str, entity: EntityKind, limit: usize) -> Result<Vec<BacklogEntry>>;

    /// Drop an entry after a successful export.
    async fn mark_resolved(&self, org_id: &str, entity: EntityKind, record_id: &str) -> Result<()>;

    /// Record a failed attempt with its error message, creating the entry
    /// when the record is not queued yet.
    async fn mark_failed(
        &self,
        org_id: &str,
        entity: EntityKind,
        record_id: &str,
        error: &str,
    ) -> Result<()>;
}
