//! Record normalization and US locale filtering.
//!
//! Turns per-tier [`RawRecord`]s into canonical [`NormalizedRecord`]s. Pure
//! functions only: the caller supplies "today" and the acquisition timestamp
//! through [`NormalizeContext`] so results are deterministic.

pub mod dates;
pub mod fields;
pub mod geo;
pub mod locale;
pub mod text;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use jobsweep_shared::{EmploymentType, ExperienceLevel, NormalizedRecord, RawRecord};

pub use dates::parse_posted_date;
pub use fields::{JobFields, lift};
pub use locale::{filter_us, is_us};

use text::{DESCRIPTION_LIMIT, EMPLOYMENT_TEXT_LIMIT, TEXT_LIMIT, clean_text, truncate_chars};

/// Clock inputs for normalization.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    /// Reference date for relative posted-date phrases.
    pub today: NaiveDate,
    /// Stamped on every record produced.
    pub acquired_at: DateTime<Utc>,
}

impl NormalizeContext {
    /// Context anchored at the current UTC time.
    pub fn now() -> Self {
        let acquired_at = Utc::now();
        Self {
            today: acquired_at.date_naive(),
            acquired_at,
        }
    }
}

/// Normalize one raw record. Returns `None` when company or title is empty
/// after cleaning.
pub fn normalize(raw: &RawRecord, ctx: &NormalizeContext) -> Option<NormalizedRecord> {
    normalize_fields(lift(raw), ctx)
}

/// Normalize already-lifted fields.
pub fn normalize_fields(fields: JobFields, ctx: &NormalizeContext) -> Option<NormalizedRecord> {
    let company_name = clean_text(&fields.company_name, TEXT_LIMIT);
    let job_title = clean_text(&fields.job_title, TEXT_LIMIT);

    if company_name.is_empty() || job_title.is_empty() {
        debug!(
            company = %fields.company_name,
            title = %fields.job_title,
            source = %fields.source,
            "dropping record with missing company or title"
        );
        return None;
    }

    Some(NormalizedRecord {
        company_name,
        job_title,
        description: clean_text(&fields.description, DESCRIPTION_LIMIT),
        location: clean_text(&fields.location, TEXT_LIMIT),
        city: clean_text(&fields.city, TEXT_LIMIT),
        state: geo::normalize_state(&clean_text(&fields.state, TEXT_LIMIT)),
        country: geo::normalize_country(&clean_text(&fields.country, TEXT_LIMIT)),
        employment_type: normalize_employment_type(&fields.employment_type),
        experience_level: ExperienceLevel::from_label(&fields.experience_level),
        posted_date: parse_posted_date(&clean_text(&fields.posted_date, TEXT_LIMIT), ctx.today),
        source_url: fields.source_url.trim().to_string(),
        source: clean_text(&fields.source, TEXT_LIMIT),
        company_size: clean_text(&fields.company_size, TEXT_LIMIT),
        industry: clean_text(&fields.industry, TEXT_LIMIT),
        search_keyword: clean_text(&fields.search_keyword, TEXT_LIMIT),
        source_job_id: fields.source_job_id.trim().to_string(),
        acquired_at: ctx.acquired_at,
    })
}

/// Map free-text employment type onto the closed vocabulary.
pub fn normalize_employment_type(input: &str) -> EmploymentType {
    let cleaned = clean_text(input, TEXT_LIMIT);
    if cleaned.is_empty() {
        return EmploymentType::Unspecified;
    }

    let lower = cleaned.to_lowercase();
    if lower.contains("full") {
        EmploymentType::FullTime
    } else if lower.contains("part") {
        EmploymentType::PartTime
    } else if lower.contains("contract") {
        EmploymentType::Contract
    } else if lower.contains("temp") {
        EmploymentType::Temporary
    } else if lower.contains("intern") {
        EmploymentType::Internship
    } else {
        EmploymentType::Other(truncate_chars(&cleaned, EMPLOYMENT_TEXT_LIMIT))
    }
}

/// Normalize a batch, dropping records that fail. Never aborts.
#[instrument(skip_all, fields(raw = raws.len()))]
pub fn normalize_all(raws: &[RawRecord], ctx: &NormalizeContext) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> =
        raws.iter().filter_map(|raw| normalize(raw, ctx)).collect();

    info!(
        normalized = records.len(),
        dropped = raws.len() - records.len(),
        "normalization complete"
    );
    records
}
