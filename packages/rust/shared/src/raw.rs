//! Raw records as produced by each acquisition tier.
//!
//! Connectors deserialize source payloads straight into these per-tier shapes,
//! so the loosely typed part of the system ends at the connector edge. Every
//! field is optional; the normalizer decides what survives.

use serde::{Deserialize, Serialize};

/// A raw posting, tagged by the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum RawRecord {
    GoogleJobs(GoogleJobsPosting),
    JSearch(JSearchPosting),
    NicheBoard(BoardCard),
}

// ---------------------------------------------------------------------------
// Tier 1: Google Jobs (SerpAPI)
// ---------------------------------------------------------------------------

/// One entry of SerpAPI's `jobs_results` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleJobsPosting {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub detected_extensions: DetectedExtensions,
    pub apply_options: Vec<ApplyOption>,
    pub job_id: Option<String>,
    /// Filled in by the connector, not by SerpAPI.
    pub search_keyword: String,
    /// Filled in by the connector, not by SerpAPI.
    pub search_location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedExtensions {
    pub schedule_type: Option<String>,
    pub posted_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOption {
    pub title: Option<String>,
    pub link: Option<String>,
}

// ---------------------------------------------------------------------------
// Tier 2: JSearch (RapidAPI)
// ---------------------------------------------------------------------------

/// One entry of JSearch's `data` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JSearchPosting {
    pub job_title: Option<String>,
    pub employer_name: Option<String>,
    pub job_city: Option<String>,
    pub job_state: Option<String>,
    pub job_country: Option<String>,
    pub job_employment_type: Option<String>,
    pub job_description: Option<String>,
    pub job_required_experience: Option<RequiredExperience>,
    pub job_posted_at_datetime_utc: Option<String>,
    pub job_apply_link: Option<String>,
    pub job_google_link: Option<String>,
    pub job_publisher: Option<String>,
    pub employer_company_type: Option<String>,
    pub job_id: Option<String>,
    /// Filled in by the connector.
    pub search_keyword: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredExperience {
    /// JSearch sends a number, a numeric string, or null.
    pub required_experience_in_months: Option<serde_json::Value>,
}

impl RequiredExperience {
    /// Required experience in months, if the source gave a usable number.
    pub fn months(&self) -> Option<u32> {
        match self.required_experience_in_months.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tier 3: niche boards
// ---------------------------------------------------------------------------

/// A listing card scraped from a niche job board and parsed best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardCard {
    pub title: String,
    pub company: String,
    /// The card's location line, verbatim.
    pub location: String,
    pub city: String,
    pub state: String,
    /// Any remaining card text.
    pub snippet: String,
    /// Absolute posting URL, or empty when the card had no link.
    pub url: String,
    /// Board name, e.g. `jobright.ai`.
    pub board: String,
    pub search_keyword: String,
}
