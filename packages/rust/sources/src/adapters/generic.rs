//! Generic (fallback) board adapter.
//!
//! Used for any configured board without a dedicated adapter. Looks for
//! anything job-ish, then for job links.

use super::BoardAdapter;

pub struct GenericBoardAdapter;

impl BoardAdapter for GenericBoardAdapter {
    fn matches(&self, _board_name: &str) -> bool {
        true
    }

    fn card_selector(&self) -> &'static str {
        r#"[class*="job-card"], [class*="JobCard"], [class*="job-listing"], [data-testid*="job"]"#
    }

    fn fallback_selector(&self) -> Option<&'static str> {
        Some(r#"a[href*="job"]"#)
    }

    fn name(&self) -> &str {
        "generic"
    }
}
