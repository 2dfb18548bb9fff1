//! Cross-system identity maps, rebuilt per sync run.
//!
//! The user map joins remote and local users on case-insensitive email
//! equality; the account map is seeded from the store and extended as the
//! account import creates or matches records. Lookups never fail: an
//! unmapped remote owner resolves to the designated default owner, and an
//! unmapped local owner on export simply omits the owner field.

use std::collections::HashMap;

use dealsync_domain::{Account, DealSyncError, Result, SfUser, User, UserRole};
use tracing::debug;

/// Bidirectional Salesforce↔local user ID map with a default owner.
#[derive(Debug, Clone)]
pub struct UserIdMap {
    by_salesforce: HashMap<String, String>,
    by_local: HashMap<String, String>,
    default_owner: String,
}

impl UserIdMap {
    /// Join remote and local users on case-insensitive email equality.
    ///
    /// Returns the map plus the local users whose stored Salesforce ID
    /// changed, for the caller to persist (one write per changed user).
    /// An organization with no local users cannot designate a default
    /// owner and is a setup error.
    pub fn build(remote_users: &[SfUser], local_users: &[User]) -> Result<(Self, Vec<User>)> {
        let default_owner = pick_default_owner(local_users).ok_or_else(|| {
            DealSyncError::Config("organization has no users; cannot resolve a default owner".into())
        })?;

        let remote_by_email: HashMap<String, &SfUser> = remote_users
            .iter()
            .filter_map(|user| {
                user.email.as_deref().map(|email| (email.trim().to_lowercase(), user))
            })
            .collect();

        let mut by_salesforce = HashMap::new();
        let mut by_local = HashMap::new();
        let mut changed = Vec::new();

        for user in local_users {
            let Some(remote) = remote_by_email.get(&user.email.trim().to_lowercase()) else {
                continue;
            };

            by_salesforce.insert(remote.id.clone(), user.id.clone());
            by_local.insert(user.id.clone(), remote.id.clone());

            if user.salesforce_id.as_deref() != Some(remote.id.as_str()) {
                let mut updated = user.clone();
                updated.salesforce_id = Some(remote.id.clone());
                changed.push(updated);
            }
        }

        debug!(
            matched = by_local.len(),
            changed = changed.len(),
            "built user ID map"
        );

        Ok((Self { by_salesforce, by_local, default_owner }, changed))
    }

    /// Local owner for a remote user ID; the default owner when the remote
    /// owner is absent or unmatched.
    pub fn local_owner(&self, salesforce_user_id: Option<&str>) -> &str {
        salesforce_user_id
            .and_then(|id| self.by_salesforce.get(id))
            .map_or(self.default_owner.as_str(), String::as_str)
    }

    /// Remote user ID for a local owner; `None` means the outgoing record
    /// omits its owner field.
    pub fn salesforce_owner(&self, local_user_id: Option<&str>) -> Option<&str> {
        local_user_id.and_then(|id| self.by_local.get(id)).map(String::as_str)
    }

    pub fn default_owner(&self) -> &str {
        &self.default_owner
    }
}

/// First admin, else first manager, else first user.
fn pick_default_owner(users: &[User]) -> Option<String> {
    users
        .iter()
        .find(|user| user.role == UserRole::Admin)
        .or_else(|| users.iter().find(|user| user.role == UserRole::Manager))
        .or_else(|| users.first())
        .map(|user| user.id.clone())
}

/// Bidirectional Salesforce↔local account ID map.
#[derive(Debug, Clone, Default)]
pub struct AccountIdMap {
    by_salesforce: HashMap<String, String>,
    by_local: HashMap<String, String>,
}

impl AccountIdMap {
    /// Seed the map from accounts already carrying a Salesforce identity.
    pub fn from_accounts<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let mut map = Self::default();
        for account in accounts {
            if let Some(salesforce_id) = &account.salesforce_id {
                map.insert(salesforce_id.clone(), account.id.clone());
            }
        }
        map
    }

    pub fn insert(&mut self, salesforce_id: String, local_id: String) {
        self.by_salesforce.insert(salesforce_id.clone(), local_id.clone());
        self.by_local.insert(local_id, salesforce_id);
    }

    pub fn local_id(&self, salesforce_id: &str) -> Option<&str> {
        self.by_salesforce.get(salesforce_id).map(String::as_str)
    }

    pub fn salesforce_id(&self, local_id: &str) -> Option<&str> {
        self.by_local.get(local_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local.is_empty()
    }
}
