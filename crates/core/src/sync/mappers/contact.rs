//! Contact field mapping.

use chrono::{DateTime, Utc};
use dealsync_domain::{Contact, SfContact, SfContactPatch};

use super::remote_is_newer;

/// True when the remote contact should overwrite the local copy. Contacts
/// record only a last-sync timestamp, so that is the reference point.
pub fn is_remote_newer(remote: &SfContact, local: &Contact) -> bool {
    remote_is_newer(remote.last_modified_date, local.last_synced_at)
}

/// Build a brand-new local contact from a remote row. `account_id` is the
/// already-resolved local account; dependent-entity skipping happens in the
/// import engine, not here.
pub fn from_remote(
    remote: &SfContact,
    id: String,
    org_id: String,
    account_id: Option<String>,
    now: DateTime<Utc>,
) -> Contact {
    Contact {
        id,
        org_id,
        first_name: remote.first_name.clone().unwrap_or_default(),
        last_name: Some(remote.last_name.clone()),
        title: remote.title.clone(),
        email: remote.email.clone(),
        phone: remote.phone.clone(),
        account_id,
        salesforce_id: Some(remote.id.clone()),
        last_synced_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// Overwrite a local contact with the remote copy.
pub fn apply_remote(
    local: &mut Contact,
    remote: &SfContact,
    account_id: Option<String>,
    now: DateTime<Utc>,
) {
    local.first_name = remote.first_name.clone().unwrap_or_default();
    local.last_name = Some(remote.last_name.clone());
    local.title = remote.title.clone();
    local.email = remote.email.clone();
    local.phone = remote.phone.clone();
    if account_id.is_some() {
        local.account_id = account_id;
    }
    local.salesforce_id = Some(remote.id.clone());
    local.last_synced_at = Some(now);
    local.updated_at = now;
}

/// Outgoing create/update body. The remote system requires a last name;
/// a contact stored with only a first name exports it in that slot.
pub fn to_patch(local: &Contact, account_salesforce_id: Option<String>) -> SfContactPatch {
    let last_name = match &local.last_name {
        Some(last) if !last.is_empty() => last.clone(),
        _ => local.first_name.clone(),
    };

    SfContactPatch {
        first_name: if local.first_name.is_empty() { None } else { Some(local.first_name.clone()) },
        last_name,
        title: local.title.clone(),
        email: local.email.clone(),
        phone: local.phone.clone(),
        account_id: account_salesforce_id,
    }
}
