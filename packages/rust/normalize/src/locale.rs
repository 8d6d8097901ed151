//! US locale filter.
//!
//! Searches are already US-scoped, so the filter leans permissive: a record
//! is kept unless something positively points outside the US.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use jobsweep_shared::NormalizedRecord;

use crate::geo::{US_STATES, is_us_country, is_us_state_code};

/// "US"/"USA" as whole words, or the spelled-out name.
static US_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bUSA?\b|UNITED STATES").expect("valid regex")
});

/// Whether a normalized record is US-based. Rules apply in order; first match wins.
pub fn is_us(record: &NormalizedRecord) -> bool {
    let country = record.country.trim().to_uppercase();
    let state = record.state.trim().to_uppercase();
    let location = record.location.trim().to_uppercase();

    if is_us_country(&country) {
        return true;
    }
    if is_us_state_code(&state) {
        return true;
    }
    if US_STATES
        .iter()
        .any(|(_, name)| location.contains(&name.to_uppercase()))
    {
        return true;
    }
    if US_STATES
        .iter()
        .any(|(code, _)| has_delimited_code(&location, code))
    {
        return true;
    }

    let remote = location.contains("REMOTE");
    if remote && US_TOKEN_RE.is_match(&location) {
        return true;
    }
    if remote && country.is_empty() {
        return true;
    }

    country.is_empty() && state.is_empty() && !location.is_empty()
}

/// ", XX" followed by end or a non-letter; a trailing " XX"; or exactly "XX".
fn has_delimited_code(location: &str, code: &str) -> bool {
    if location == code {
        return true;
    }
    if location
        .strip_suffix(code)
        .is_some_and(|head| head.ends_with(' '))
    {
        return true;
    }

    let needle = format!(", {code}");
    location.match_indices(&needle).any(|(idx, _)| {
        location[idx + needle.len()..]
            .chars()
            .next()
            .is_none_or(|next| !next.is_alphabetic())
    })
}

/// Keep only US-based records, preserving order.
pub fn filter_us(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    let before = records.len();
    let kept: Vec<NormalizedRecord> = records
        .into_iter()
        .filter(|record| {
            let keep = is_us(record);
            if !keep {
                debug!(
                    company = %record.company_name,
                    title = %record.job_title,
                    location = %record.location,
                    "filtered non-US posting"
                );
            }
            keep
        })
        .collect();

    let dropped = before - kept.len();
    if dropped > 0 {
        info!(kept = kept.len(), dropped, "locale filter applied");
    }
    kept
}
