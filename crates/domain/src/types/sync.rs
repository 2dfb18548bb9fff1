//! Sync run reporting and the retry backlog entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity types handled by the sync engine, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Contact,
    Opportunity,
}

impl EntityKind {
    /// Dependency order for a sync run: accounts first, opportunities last.
    pub const ORDERED: [Self; 3] = [Self::Account, Self::Contact, Self::Opportunity];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Contact => "contact",
            Self::Opportunity => "opportunity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "account" => Some(Self::Account),
            "contact" => Some(Self::Contact),
            "opportunity" => Some(Self::Opportunity),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and per-record errors for one entity type in one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReport {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

impl EntityReport {
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Overall outcome of a sync run. A run that completed with per-record
/// errors is `Partial`, never a thrown failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Success,
    Partial,
}

/// Summary of one bidirectional sync run for one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunSummary {
    pub org_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub import: DirectionReport,
    pub export: DirectionReport,
}

/// Per-entity reports for one direction of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectionReport {
    pub accounts: EntityReport,
    pub contacts: EntityReport,
    pub opportunities: EntityReport,
}

impl DirectionReport {
    pub fn error_count(&self) -> usize {
        self.accounts.errors.len() + self.contacts.errors.len() + self.opportunities.errors.len()
    }
}

impl SyncRunSummary {
    pub fn status(&self) -> SyncRunStatus {
        if self.import.error_count() + self.export.error_count() == 0 {
            SyncRunStatus::Success
        } else {
            SyncRunStatus::Partial
        }
    }
}

/// One record awaiting re-export after a failed push.
///
/// All entity types share this queue; it replaces the original design's
/// split between an opportunity status flag and implicit modified-since
/// reselection for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub id: String,
    pub org_id: String,
    pub entity: EntityKind,
    /// Local ID of the record to re-export.
    pub record_id: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}
