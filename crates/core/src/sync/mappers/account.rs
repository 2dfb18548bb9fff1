//! Account field mapping.

use chrono::{DateTime, Utc};
use dealsync_domain::{Account, SfAccount, SfAccountPatch};

use super::remote_is_newer;

/// True when the remote account should overwrite the local copy.
pub fn is_remote_newer(remote: &SfAccount, local: &Account) -> bool {
    remote_is_newer(remote.last_modified_date, local.salesforce_last_modified)
}

/// Build a brand-new local account from a remote row.
pub fn from_remote(
    remote: &SfAccount,
    id: String,
    org_id: String,
    owner_id: Option<String>,
    now: DateTime<Utc>,
) -> Account {
    Account {
        id,
        org_id,
        name: remote.name.clone(),
        website: remote.website.clone(),
        industry: remote.industry.clone(),
        owner_id,
        salesforce_id: Some(remote.id.clone()),
        salesforce_last_modified: Some(remote.last_modified_date),
        last_synced_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// Overwrite a local account with the remote copy (newer-wins already
/// decided by the caller).
pub fn apply_remote(
    local: &mut Account,
    remote: &SfAccount,
    owner_id: Option<String>,
    now: DateTime<Utc>,
) {
    local.name = remote.name.clone();
    local.website = remote.website.clone();
    local.industry = remote.industry.clone();
    if owner_id.is_some() {
        local.owner_id = owner_id;
    }
    local.salesforce_id = Some(remote.id.clone());
    local.salesforce_last_modified = Some(remote.last_modified_date);
    local.last_synced_at = Some(now);
    local.updated_at = now;
}

/// Outgoing create/update body for a local account. `owner_id` is the
/// already-resolved Salesforce user ID; absent owners are omitted.
pub fn to_patch(local: &Account, owner_id: Option<String>) -> SfAccountPatch {
    SfAccountPatch {
        name: local.name.clone(),
        website: local.website.clone(),
        industry: local.industry.clone(),
        owner_id,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn remote_account(last_modified: DateTime<Utc>) -> SfAccount {
        SfAccount {
            id: "001000000000001AAA".to_string(),
            name: "Acme Corp".to_string(),
            website: Some("https://acme.example".to_string()),
            industry: Some("Manufacturing".to_string()),
            owner_id: Some("005000000000001AAA".to_string()),
            last_modified_date: last_modified,
        }
    }

    #[test]
    fn never_synced_local_account_counts_as_older() {
        let remote = remote_account(ts(2024, 1, 1));
        let local = from_remote(&remote, "a-1".into(), "org-1".into(), None, ts(2024, 1, 1));

        let mut unsynced = local;
        unsynced.salesforce_last_modified = None;
        assert!(is_remote_newer(&remote, &unsynced));
    }

    #[test]
    fn apply_remote_keeps_existing_owner_when_unresolved() {
        let remote = remote_account(ts(2024, 2, 1));
        let mut local =
            from_remote(&remote, "a-1".into(), "org-1".into(), Some("u-1".into()), ts(2024, 1, 1));

        apply_remote(&mut local, &remote, None, ts(2024, 2, 2));
        assert_eq!(local.owner_id.as_deref(), Some("u-1"));
        assert_eq!(local.salesforce_last_modified, Some(ts(2024, 2, 1)));
    }
}
