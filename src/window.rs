//! Window selection: which clinical annotations are eligible for a section.
//!
//! Each section anchors its window on either the first or the last note of
//! the admission and extends it forward or backward a fixed number of days.
//! Windows operate at date granularity with inclusive bounds. A missing
//! anchor (no notes yet) degrades to an unbounded window; that is documented
//! behavior, not a failure.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which annotation timestamp anchors a section's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteAnchor {
    /// Earliest annotation of the admission.
    FirstNote,
    /// Latest annotation of the admission.
    LastNote,
}

/// How far a section's window extends from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowPolicy {
    /// Every record of the admission is eligible.
    Unbounded,
    /// `[anchor, anchor + days]`.
    Forward { days: i64 },
    /// `[anchor - days, anchor]`.
    Backward { days: i64 },
}

/// Inclusive date range, or `None` for an unbounded window.
pub type DateWindow = Option<(NaiveDate, NaiveDate)>;

/// Compute the section window for an anchor timestamp and a policy.
pub fn select_window(anchor: Option<NaiveDateTime>, policy: WindowPolicy) -> DateWindow {
    match (anchor, policy) {
        (_, WindowPolicy::Unbounded) | (None, _) => None,
        (Some(ts), WindowPolicy::Forward { days }) => {
            let day = ts.date();
            Some((day, day + Duration::days(days)))
        }
        (Some(ts), WindowPolicy::Backward { days }) => {
            let day = ts.date();
            Some((day - Duration::days(days), day))
        }
    }
}

/// Whether a record timestamp falls inside the window.
pub fn in_window(window: DateWindow, when: NaiveDateTime) -> bool {
    match window {
        None => true,
        Some((start, end)) => {
            let day = when.date();
            start <= day && day <= end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn forward_window_spans_anchor_to_anchor_plus_days() {
        let window = select_window(Some(ts("2024-05-01T15:45:00")), WindowPolicy::Forward { days: 4 });
        assert_eq!(
            window,
            Some(("2024-05-01".parse().unwrap(), "2024-05-05".parse().unwrap()))
        );
    }

    #[test]
    fn backward_window_spans_anchor_minus_days_to_anchor() {
        let window = select_window(Some(ts("2024-05-10T02:00:00")), WindowPolicy::Backward { days: 1 });
        assert_eq!(
            window,
            Some(("2024-05-09".parse().unwrap(), "2024-05-10".parse().unwrap()))
        );
    }

    #[test]
    fn unbounded_policy_ignores_anchor() {
        assert_eq!(select_window(Some(ts("2024-05-01T00:00:00")), WindowPolicy::Unbounded), None);
    }

    #[test]
    fn missing_anchor_degrades_to_unbounded() {
        assert_eq!(select_window(None, WindowPolicy::Forward { days: 4 }), None);
        assert_eq!(select_window(None, WindowPolicy::Backward { days: 1 }), None);
    }

    #[test]
    fn inclusion_is_inclusive_on_both_bounds() {
        let window = select_window(Some(ts("2024-05-01T12:00:00")), WindowPolicy::Forward { days: 4 });
        // t is included iff anchor <= t <= anchor + d, at date granularity.
        assert!(in_window(window, ts("2024-05-01T00:00:00")));
        assert!(in_window(window, ts("2024-05-05T23:59:59")));
        assert!(!in_window(window, ts("2024-04-30T23:59:59")));
        assert!(!in_window(window, ts("2024-05-06T00:00:00")));
    }

    #[test]
    fn unbounded_window_includes_everything() {
        assert!(in_window(None, ts("1999-01-01T00:00:00")));
        assert!(in_window(None, ts("2077-12-31T23:59:59")));
    }
}
