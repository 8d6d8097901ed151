//! Per-tier extraction of loose job fields from raw records.
//!
//! Each source reports the same facts in a different shape. Lifting flattens
//! them into [`JobFields`] before any cleaning happens, so the normalizer
//! itself only deals with one shape.

use jobsweep_shared::{BoardCard, GoogleJobsPosting, JSearchPosting, RawRecord};

/// Default source name when Google Jobs gives no apply option title.
const GOOGLE_JOBS_SOURCE: &str = "Google Jobs";

/// Default source name when JSearch gives no publisher.
const JSEARCH_SOURCE: &str = "JSearch";

/// Flat, uncleaned field set with the same names as the normalized record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFields {
    pub company_name: String,
    pub job_title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub employment_type: String,
    pub experience_level: String,
    pub posted_date: String,
    pub source_url: String,
    pub source: String,
    pub company_size: String,
    pub industry: String,
    pub search_keyword: String,
    pub source_job_id: String,
}

/// Lift a raw record into loose fields using its tier's extraction rules.
pub fn lift(raw: &RawRecord) -> JobFields {
    match raw {
        RawRecord::GoogleJobs(posting) => lift_google_jobs(posting),
        RawRecord::JSearch(posting) => lift_jsearch(posting),
        RawRecord::NicheBoard(card) => lift_board_card(card),
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

// ---------------------------------------------------------------------------
// Tier 1
// ---------------------------------------------------------------------------

fn lift_google_jobs(posting: &GoogleJobsPosting) -> JobFields {
    let location = text(&posting.location);
    let (city, state, country) = split_location(&location);
    let description = text(&posting.description);

    let first_apply = posting.apply_options.first();
    let source_url = first_apply
        .map(|opt| text(&opt.link))
        .unwrap_or_default();
    let source = first_apply
        .map(|opt| text(&opt.title))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| GOOGLE_JOBS_SOURCE.to_string());

    JobFields {
        company_name: text(&posting.company_name),
        job_title: text(&posting.title),
        experience_level: experience_from_description(&description)
            .unwrap_or_default()
            .to_string(),
        description,
        location,
        city,
        state,
        country,
        employment_type: text(&posting.detected_extensions.schedule_type),
        posted_date: text(&posting.detected_extensions.posted_at),
        source_url,
        source,
        search_keyword: posting.search_keyword.clone(),
        source_job_id: text(&posting.job_id),
        ..JobFields::default()
    }
}

/// Split "City, ST[, Country]" on commas. Country defaults to "US".
fn split_location(location: &str) -> (String, String, String) {
    let mut parts = location.split(',').map(str::trim);
    let city = parts.next().unwrap_or_default().to_string();
    let state = parts.next().unwrap_or_default().to_string();
    let country = parts
        .next()
        .filter(|c| !c.is_empty())
        .unwrap_or("US")
        .to_string();
    (city, state, country)
}

// ---------------------------------------------------------------------------
// Tier 2
// ---------------------------------------------------------------------------

fn lift_jsearch(posting: &JSearchPosting) -> JobFields {
    let city = text(&posting.job_city);
    let state = text(&posting.job_state);
    let country = Some(text(&posting.job_country))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "US".to_string());

    let location = [city.as_str(), state.as_str(), country.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let description = text(&posting.job_description);

    let experience = posting
        .job_required_experience
        .as_ref()
        .and_then(|req| req.months())
        .filter(|months| *months > 0)
        .map(experience_from_months)
        .or_else(|| experience_from_description(&description))
        .unwrap_or_default();

    let posted_date: String = text(&posting.job_posted_at_datetime_utc)
        .chars()
        .take(10)
        .collect();

    let source_url = Some(text(&posting.job_apply_link))
        .filter(|link| !link.is_empty())
        .unwrap_or_else(|| text(&posting.job_google_link));

    let source = Some(text(&posting.job_publisher))
        .filter(|publisher| !publisher.is_empty())
        .unwrap_or_else(|| JSEARCH_SOURCE.to_string());

    JobFields {
        company_name: text(&posting.employer_name),
        job_title: text(&posting.job_title),
        description,
        location,
        city,
        state,
        country,
        employment_type: map_jsearch_employment(&text(&posting.job_employment_type)),
        experience_level: experience.to_string(),
        posted_date,
        source_url,
        source,
        company_size: String::new(),
        industry: text(&posting.employer_company_type),
        search_keyword: posting.search_keyword.clone(),
        source_job_id: text(&posting.job_id),
    }
}

/// JSearch employment codes to display labels; unknown codes pass through.
fn map_jsearch_employment(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "FULLTIME" => "Full-time".to_string(),
        "PARTTIME" => "Part-time".to_string(),
        "CONTRACTOR" => "Contract".to_string(),
        "INTERN" => "Internship".to_string(),
        "TEMPORARY" => "Temporary".to_string(),
        _ => code.to_string(),
    }
}

/// Bucket required experience in months.
pub fn experience_from_months(months: u32) -> &'static str {
    match months {
        0..=12 => "Entry Level",
        13..=36 => "Junior",
        37..=60 => "Mid Level",
        61..=96 => "Senior",
        _ => "Manager/Director",
    }
}

/// Keyword sniffing over a description. First matching bucket wins.
pub fn experience_from_description(description: &str) -> Option<&'static str> {
    const BUCKETS: &[(&str, &[&str])] = &[
        (
            "Entry Level",
            &["entry level", "entry-level", "0-1 year", "no experience"],
        ),
        (
            "Senior",
            &["senior", "sr.", "7+ years", "8+ years", "10+ years", "lead"],
        ),
        (
            "Mid Level",
            &["mid-level", "mid level", "3-5 years", "3+ years", "4+ years", "5+ years"],
        ),
        ("Manager/Director", &["manager", "director", "vp ", "vice president"]),
        ("Junior", &["junior", "jr.", "1-2 years", "1-3 years", "2+ years"]),
    ];

    let lower = description.to_lowercase();
    BUCKETS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(label, _)| *label)
}

// ---------------------------------------------------------------------------
// Tier 3
// ---------------------------------------------------------------------------

fn lift_board_card(card: &BoardCard) -> JobFields {
    JobFields {
        company_name: card.company.trim().to_string(),
        job_title: card.title.trim().to_string(),
        description: card.snippet.clone(),
        location: card.location.clone(),
        city: card.city.clone(),
        state: card.state.clone(),
        country: "US".to_string(),
        source_url: card.url.clone(),
        source: card.board.clone(),
        search_keyword: card.search_keyword.clone(),
        ..JobFields::default()
    }
}
