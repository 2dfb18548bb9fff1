//! Local CRM entities in their sync-relevant shape.
//!
//! These mirror the pipeline tracker's own records. Only the attributes the
//! synchronization engine reads or writes are modeled; presentation-only
//! columns stay in the web application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage of an opportunity. Closed set, ordered from earliest to
/// latest; `Prospecting` is the fallback for unrecognized remote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Prospecting,
    Qualification,
    NeedsAnalysis,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl PipelineStage {
    /// All stages, in pipeline order.
    pub const ALL: [Self; 7] = [
        Self::Prospecting,
        Self::Qualification,
        Self::NeedsAnalysis,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    /// Stable identifier used for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Qualification => "qualification",
            Self::NeedsAnalysis => "needs_analysis",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    /// Parse the stored identifier back into a stage.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == value)
    }
}

/// Forecast category of an opportunity. Closed set; absent means the remote
/// category text matched nothing and was deliberately not guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastCategory {
    Pipeline,
    BestCase,
    Commit,
    Omitted,
    Closed,
}

impl ForecastCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::BestCase => "best_case",
            Self::Commit => "commit",
            Self::Omitted => "omitted",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pipeline" => Some(Self::Pipeline),
            "best_case" => Some(Self::BestCase),
            "commit" => Some(Self::Commit),
            "omitted" => Some(Self::Omitted),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Push-side sync state of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunitySyncStatus {
    Synced,
    PendingPush,
}

impl OpportunitySyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::PendingPush => "pending_push",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "synced" => Some(Self::Synced),
            "pending_push" => Some(Self::PendingPush),
            _ => None,
        }
    }
}

/// Role of a local user, used by the default-owner rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Member,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// A company record in the pipeline tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
    /// Local user owning the account.
    pub owner_id: Option<String>,
    /// Remote identity; unique per organization when present.
    pub salesforce_id: Option<String>,
    /// Last-modified timestamp seen on the remote copy.
    pub salesforce_last_modified: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub org_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub account_id: Option<String>,
    pub salesforce_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deal moving through the pipeline.
///
/// Monetary amounts are stored as integer minor currency units (cents);
/// the remote system deals in decimal major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub amount_cents: i64,
    pub close_date: NaiveDate,
    pub stage: PipelineStage,
    /// Confidence score, 1 (long shot) to 5 (near certain).
    pub confidence: u8,
    pub forecast_category: Option<ForecastCategory>,
    pub owner_id: Option<String>,
    pub account_id: String,
    pub salesforce_id: Option<String>,
    pub salesforce_last_modified: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_status: OpportunitySyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A local user of the pipeline tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub org_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub salesforce_id: Option<String>,
}
