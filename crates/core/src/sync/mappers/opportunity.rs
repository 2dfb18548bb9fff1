//! Opportunity field mapping.
//!
//! Carries the two scale conversions: decimal amounts to integer cents and
//! the remote 0–100 probability to the local 1–5 confidence score.

use chrono::{DateTime, Utc};
use dealsync_domain::{
    Opportunity, OpportunitySyncStatus, SfOpportunity, SfOpportunityPatch,
};

use super::{forecast, money, remote_is_newer, stage};

/// Probability percentage assigned to each confidence score (index 0 is
/// confidence 1). Symmetric with [`probability_to_confidence`] within
/// rounding.
const CONFIDENCE_PROBABILITY: [f64; 5] = [10.0, 30.0, 50.0, 70.0, 90.0];

/// Confidence score (1–5) to remote probability percentage.
pub fn confidence_to_probability(confidence: u8) -> f64 {
    let index = confidence.clamp(1, 5) as usize - 1;
    CONFIDENCE_PROBABILITY[index]
}

/// Remote probability percentage to confidence score (1–5).
pub fn probability_to_confidence(probability: f64) -> u8 {
    match probability {
        p if p < 20.0 => 1,
        p if p < 40.0 => 2,
        p if p < 60.0 => 3,
        p if p < 80.0 => 4,
        _ => 5,
    }
}

/// True when the remote opportunity should overwrite the local copy.
pub fn is_remote_newer(remote: &SfOpportunity, local: &Opportunity) -> bool {
    remote_is_newer(remote.last_modified_date, local.salesforce_last_modified)
}

/// Build a brand-new local opportunity from a remote row. The caller has
/// already resolved the owner (default-owner fallback applies) and account.
pub fn from_remote(
    remote: &SfOpportunity,
    id: String,
    org_id: String,
    owner_id: String,
    account_id: String,
    now: DateTime<Utc>,
) -> Opportunity {
    Opportunity {
        id,
        org_id,
        name: remote.name.clone(),
        amount_cents: remote.amount.map_or(0, money::amount_to_cents),
        close_date: remote.close_date,
        stage: stage::from_remote(&remote.stage_name),
        confidence: remote.probability.map_or(3, probability_to_confidence),
        forecast_category: remote
            .forecast_category_name
            .as_deref()
            .and_then(forecast::from_remote),
        owner_id: Some(owner_id),
        account_id,
        salesforce_id: Some(remote.id.clone()),
        salesforce_last_modified: Some(remote.last_modified_date),
        last_synced_at: Some(now),
        sync_status: OpportunitySyncStatus::Synced,
        created_at: now,
        updated_at: now,
    }
}

/// Overwrite a local opportunity with the remote copy.
pub fn apply_remote(
    local: &mut Opportunity,
    remote: &SfOpportunity,
    owner_id: Option<String>,
    now: DateTime<Utc>,
) {
    local.name = remote.name.clone();
    if let Some(amount) = remote.amount {
        local.amount_cents = money::amount_to_cents(amount);
    }
    local.close_date = remote.close_date;
    local.stage = stage::from_remote(&remote.stage_name);
    if let Some(probability) = remote.probability {
        local.confidence = probability_to_confidence(probability);
    }
    local.forecast_category =
        remote.forecast_category_name.as_deref().and_then(forecast::from_remote);
    if owner_id.is_some() {
        local.owner_id = owner_id;
    }
    local.salesforce_id = Some(remote.id.clone());
    local.salesforce_last_modified = Some(remote.last_modified_date);
    local.last_synced_at = Some(now);
    local.sync_status = OpportunitySyncStatus::Synced;
    local.updated_at = now;
}

/// Outgoing create/update body. `account_salesforce_id` must already be
/// resolved — the export engine skips opportunities whose account has no
/// remote counterpart.
pub fn to_patch(
    local: &Opportunity,
    owner_salesforce_id: Option<String>,
    account_salesforce_id: String,
) -> SfOpportunityPatch {
    SfOpportunityPatch {
        name: local.name.clone(),
        amount: money::cents_to_amount(local.amount_cents),
        close_date: local.close_date,
        stage_name: stage::to_remote(local.stage).to_string(),
        probability: confidence_to_probability(local.confidence),
        forecast_category_name: local.forecast_category.map(|c| forecast::to_remote(c).to_string()),
        owner_id: owner_salesforce_id,
        account_id: account_salesforce_id,
    }
}
