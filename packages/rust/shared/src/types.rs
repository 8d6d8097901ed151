//! Core domain types for the job-posting pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// An independent acquisition source with its own fan-out strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Tier 1: Google Jobs via SerpAPI, keyword × location, paginated.
    Primary,
    /// Tier 2: JSearch via RapidAPI, metered, small location subset.
    Supplementary,
    /// Tier 3: niche job boards, keyword-only crawl.
    Niche,
}

impl Tier {
    /// All tiers in run order.
    pub const ALL: [Tier; 3] = [Tier::Primary, Tier::Supplementary, Tier::Niche];

    /// The tier's number as used on the command line (1, 2, 3).
    pub fn number(self) -> u8 {
        match self {
            Tier::Primary => 1,
            Tier::Supplementary => 2,
            Tier::Niche => 3,
        }
    }

    /// Short name of the source family backing this tier.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Primary => "google-jobs",
            Tier::Supplementary => "jsearch",
            Tier::Niche => "niche-boards",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.number(), self.label())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "primary" | "google-jobs" | "serpapi" => Ok(Tier::Primary),
            "2" | "supplementary" | "jsearch" => Ok(Tier::Supplementary),
            "3" | "niche" | "niche-boards" => Ok(Tier::Niche),
            other => Err(format!("unknown tier '{other}': expected 1, 2, or 3")),
        }
    }
}

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

/// Normalized employment type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    /// Free text that matched none of the known types (truncated).
    Other(String),
    #[default]
    Unspecified,
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmploymentType::FullTime => f.write_str("Full-time"),
            EmploymentType::PartTime => f.write_str("Part-time"),
            EmploymentType::Contract => f.write_str("Contract"),
            EmploymentType::Temporary => f.write_str("Temporary"),
            EmploymentType::Internship => f.write_str("Internship"),
            EmploymentType::Other(text) => f.write_str(text),
            EmploymentType::Unspecified => Ok(()),
        }
    }
}

/// Normalized seniority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Entry,
    Junior,
    Mid,
    Senior,
    ManagerDirector,
    #[default]
    Unknown,
}

impl ExperienceLevel {
    /// Parse the display label produced by the source-specific extractors.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "entry level" | "entry" => ExperienceLevel::Entry,
            "junior" => ExperienceLevel::Junior,
            "mid level" | "mid" => ExperienceLevel::Mid,
            "senior" => ExperienceLevel::Senior,
            "manager/director" | "manager" | "director" => ExperienceLevel::ManagerDirector,
            _ => ExperienceLevel::Unknown,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExperienceLevel::Entry => "Entry Level",
            ExperienceLevel::Junior => "Junior",
            ExperienceLevel::Mid => "Mid Level",
            ExperienceLevel::Senior => "Senior",
            ExperienceLevel::ManagerDirector => "Manager/Director",
            ExperienceLevel::Unknown => "",
        };
        f.write_str(label)
    }
}

/// Best-effort posting date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostedDate {
    /// Resolved calendar date.
    Date(NaiveDate),
    /// Phrasing we could not resolve, passed through (truncated).
    Unparsed(String),
    #[default]
    Unknown,
}

impl fmt::Display for PostedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostedDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            PostedDate::Unparsed(text) => f.write_str(text),
            PostedDate::Unknown => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// NormalizedRecord
// ---------------------------------------------------------------------------

/// The canonical job posting shape every source is reduced to.
///
/// `company_name` and `job_title` are never empty; the normalizer drops
/// records that would violate this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub company_name: String,
    pub job_title: String,
    pub description: String,
    /// Raw location string as reported by the source.
    pub location: String,
    pub city: String,
    /// Two-letter code when recognized, otherwise blank or source text.
    pub state: String,
    pub country: String,
    pub employment_type: EmploymentType,
    pub experience_level: ExperienceLevel,
    pub posted_date: PostedDate,
    /// Posting URL; empty when the source did not provide one.
    pub source_url: String,
    /// Job board / publisher name.
    pub source: String,
    pub company_size: String,
    pub industry: String,
    /// The search keyword that surfaced this posting.
    pub search_keyword: String,
    /// Source-native identifier, when the source has one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_job_id: String,
    /// When the record was acquired and normalized.
    pub acquired_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Registry rows
// ---------------------------------------------------------------------------

/// A previously delivered posting, as persisted in the dedup registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    pub url: String,
    pub fingerprint: String,
    pub source: String,
    pub company: String,
    pub title: String,
    pub seen_at: DateTime<Utc>,
}

/// Aggregate counts over the dedup registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Total committed entries.
    pub total: u64,
    pub unique_companies: u64,
    pub unique_sources: u64,
    /// Entries per source, most frequent first.
    pub by_source: Vec<(String, u64)>,
}
