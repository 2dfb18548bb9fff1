//! Pipeline stage translation.
//!
//! A fixed table covers the picklist values the connected org uses; remote
//! names outside the table fall through substring heuristics, and anything
//! still unmatched defaults to the earliest stage. The fallback is lossy by
//! design and pinned by tests.

use std::collections::HashMap;

use dealsync_domain::PipelineStage;
use once_cell::sync::Lazy;

/// Lowercased remote names (canonical plus common org variants) accepted
/// without resorting to heuristics.
static FROM_REMOTE: Lazy<HashMap<&'static str, PipelineStage>> = Lazy::new(|| {
    HashMap::from([
        ("prospecting", PipelineStage::Prospecting),
        ("qualification", PipelineStage::Qualification),
        ("needs analysis", PipelineStage::NeedsAnalysis),
        ("proposal/price quote", PipelineStage::Proposal),
        ("negotiation/review", PipelineStage::Negotiation),
        ("closed won", PipelineStage::ClosedWon),
        ("closed lost", PipelineStage::ClosedLost),
        ("value proposition", PipelineStage::Proposal),
        ("id. decision makers", PipelineStage::Qualification),
        ("perception analysis", PipelineStage::NeedsAnalysis),
    ])
});

/// Remote stage name for a local stage. Total: every stage has one.
pub fn to_remote(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Prospecting => "Prospecting",
        PipelineStage::Qualification => "Qualification",
        PipelineStage::NeedsAnalysis => "Needs Analysis",
        PipelineStage::Proposal => "Proposal/Price Quote",
        PipelineStage::Negotiation => "Negotiation/Review",
        PipelineStage::ClosedWon => "Closed Won",
        PipelineStage::ClosedLost => "Closed Lost",
    }
}

/// Local stage for a remote stage name. Total: never fails, falling back to
/// substring heuristics and finally the earliest stage.
pub fn from_remote(name: &str) -> PipelineStage {
    let normalized = name.trim().to_lowercase();

    if let Some(stage) = FROM_REMOTE.get(normalized.as_str()) {
        return *stage;
    }

    heuristic(&normalized).unwrap_or(PipelineStage::Prospecting)
}

fn heuristic(normalized: &str) -> Option<PipelineStage> {
    let has = |needle: &str| normalized.contains(needle);

    if has("closed") && has("won") {
        return Some(PipelineStage::ClosedWon);
    }
    if has("closed") && has("lost") {
        return Some(PipelineStage::ClosedLost);
    }
    if has("won") {
        return Some(PipelineStage::ClosedWon);
    }
    if has("lost") {
        return Some(PipelineStage::ClosedLost);
    }
    if has("negoti") || has("review") {
        return Some(PipelineStage::Negotiation);
    }
    if has("propos") || has("quote") {
        return Some(PipelineStage::Proposal);
    }
    if has("qualif") {
        return Some(PipelineStage::Qualification);
    }
    if has("needs") || has("analysis") {
        return Some(PipelineStage::NeedsAnalysis);
    }
    if has("prospect") || has("discovery") {
        return Some(PipelineStage::Prospecting);
    }

    None
}
