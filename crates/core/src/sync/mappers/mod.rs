//! Pure, side-effect-free field translation between local records and the
//! Salesforce wire shape.
//!
//! Mapping ambiguity is never an error: unrecognized stage names resolve
//! through substring heuristics to a documented fallback, and unrecognized
//! forecast categories map to absent. The `is_remote_newer` predicates here
//! are the single source of truth for the newer-wins rule.

pub mod account;
pub mod contact;
pub mod forecast;
pub mod money;
pub mod opportunity;
pub mod stage;

use chrono::{DateTime, Utc};

/// Newer-wins predicate: true when no local sync metadata exists, or the
/// remote last-modified timestamp strictly exceeds the recorded one.
pub fn remote_is_newer(
    remote_last_modified: DateTime<Utc>,
    recorded: Option<DateTime<Utc>>,
) -> bool {
    recorded.map_or(true, |ts| remote_last_modified > ts)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn missing_local_metadata_means_remote_wins() {
        assert!(remote_is_newer(ts(2024, 1, 1), None));
    }

    #[test]
    fn strictly_newer_remote_wins() {
        assert!(remote_is_newer(ts(2024, 1, 2), Some(ts(2024, 1, 1))));
    }

    #[test]
    fn equal_timestamps_do_not_win() {
        assert!(!remote_is_newer(ts(2024, 1, 1), Some(ts(2024, 1, 1))));
    }

    #[test]
    fn older_remote_loses() {
        assert!(!remote_is_newer(ts(2023, 12, 31), Some(ts(2024, 1, 1))));
    }
}
