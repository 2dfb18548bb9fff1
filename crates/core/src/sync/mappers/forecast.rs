//! Forecast category translation.
//!
//! Remote category names are free text in practice (orgs rename them), so
//! matching is case-insensitive substring based. Text matching nothing maps
//! to absent — a category is never guessed.

use dealsync_domain::ForecastCategory;

/// Remote category name for a local category.
pub fn to_remote(category: ForecastCategory) -> &'static str {
    match category {
        ForecastCategory::Pipeline => "Pipeline",
        ForecastCategory::BestCase => "Best Case",
        ForecastCategory::Commit => "Commit",
        ForecastCategory::Omitted => "Omitted",
        ForecastCategory::Closed => "Closed",
    }
}

/// Local category for remote category text; `None` when nothing matches.
pub fn from_remote(name: &str) -> Option<ForecastCategory> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let has = |needle: &str| normalized.contains(needle);

    if has("commit") {
        Some(ForecastCategory::Commit)
    } else if has("best case") || has("upside") {
        Some(ForecastCategory::BestCase)
    } else if has("omit") {
        Some(ForecastCategory::Omitted)
    } else if has("pipeline") {
        Some(ForecastCategory::Pipeline)
    } else if has("closed") {
        Some(ForecastCategory::Closed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for category in [
            ForecastCategory::Pipeline,
            ForecastCategory::BestCase,
            ForecastCategory::Commit,
            ForecastCategory::Omitted,
            ForecastCategory::Closed,
        ] {
            assert_eq!(from_remote(to_remote(category)), Some(category));
        }
    }

    #[test]
    fn matching_ignores_case_and_decoration() {
        assert_eq!(from_remote("COMMIT"), Some(ForecastCategory::Commit));
        assert_eq!(from_remote("Upside / stretch"), Some(ForecastCategory::BestCase));
        assert_eq!(from_remote("Closed Won"), Some(ForecastCategory::Closed));
        assert_eq!(from_remote("Omitted from forecast"), Some(ForecastCategory::Omitted));
    }

    #[test]
    fn unmatched_text_maps_to_absent() {
        assert_eq!(from_remote("Moonshot"), None);
        assert_eq!(from_remote(""), None);
        assert_eq!(from_remote("   "), None);
    }
}
