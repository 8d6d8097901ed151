//! Posted-date resolution: ISO prefixes and relative phrasing.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;

use jobsweep_shared::PostedDate;

use crate::text::{UNPARSED_DATE_LIMIT, truncate_chars};

static ISO_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"));

static IMMEDIATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(just|today|now)\b").expect("valid regex"));

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\+?\s*(minute|hour|day|week|month)").expect("valid regex")
});

/// Resolve a source's posted-date text against `today`.
///
/// A month counts as 30 days. Anything unrecognized is kept as
/// [`PostedDate::Unparsed`], capped at 20 characters.
pub fn parse_posted_date(input: &str, today: NaiveDate) -> PostedDate {
    let input = input.trim();
    if input.is_empty() {
        return PostedDate::Unknown;
    }

    if let Some(m) = ISO_PREFIX_RE.find(input) {
        return match NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d") {
            Ok(date) => PostedDate::Date(date),
            Err(_) => unparsed(input),
        };
    }

    let lower = input.to_lowercase();

    if IMMEDIATE_RE.is_match(&lower) {
        return PostedDate::Date(today);
    }
    if lower.contains("yesterday") {
        return days_before(today, 1).unwrap_or_else(|| unparsed(input));
    }

    if let Some(caps) = RELATIVE_RE.captures(&lower) {
        let Ok(amount) = caps[1].parse::<u64>() else {
            return unparsed(input);
        };
        let days = match &caps[2] {
            "minute" | "hour" => Some(0),
            "day" => Some(amount),
            "week" => amount.checked_mul(7),
            "month" => amount.checked_mul(30),
            _ => None,
        };
        return days
            .and_then(|d| days_before(today, d))
            .unwrap_or_else(|| unparsed(input));
    }

    unparsed(input)
}

fn days_before(today: NaiveDate, days: u64) -> Option<PostedDate> {
    today.checked_sub_days(Days::new(days)).map(PostedDate::Date)
}

fn unparsed(input: &str) -> PostedDate {
    PostedDate::Unparsed(truncate_chars(input, UNPARSED_DATE_LIMIT))
}
