//! Application configuration for jobsweep.
//!
//! User config lives at `~/.jobsweep/jobsweep.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored here; the config names the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JobsweepError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "jobsweep.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".jobsweep";

/// Keywords tracked when the config does not override them.
const DEFAULT_KEYWORDS: &[&str] = &[
    "Accounts Payable",
    "Accounts Payables",
    "Accounts Payable Clerk",
    "Accounts Payable Specialist",
    "Accounts Payable Analyst",
    "Accounts Payable Manager",
    "Full Cycle Accounts Payable",
];

/// US metros searched for geographic coverage.
const DEFAULT_LOCATIONS: &[&str] = &[
    "United States",
    "New York, NY",
    "Los Angeles, CA",
    "Chicago, IL",
    "Houston, TX",
    "Phoenix, AZ",
    "Philadelphia, PA",
    "San Antonio, TX",
    "San Diego, CA",
    "Dallas, TX",
    "Austin, TX",
    "San Francisco, CA",
    "Seattle, WA",
    "Denver, CO",
    "Boston, MA",
    "Atlanta, GA",
    "Miami, FL",
    "Minneapolis, MN",
    "Charlotte, NC",
    "Detroit, MI",
    "Portland, OR",
    "Nashville, TN",
    "Salt Lake City, UT",
    "Kansas City, MO",
    "Columbus, OH",
    "Indianapolis, IN",
    "Cleveland, OH",
    "Pittsburgh, PA",
    "Cincinnati, OH",
    "Orlando, FL",
    "Tampa, FL",
    "St. Louis, MO",
    "Baltimore, MD",
    "Raleigh, NC",
    "Richmond, VA",
    "Milwaukee, WI",
];

// ---------------------------------------------------------------------------
// Config structs (matching jobsweep.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Tier 1 settings.
    #[serde(default)]
    pub google_jobs: GoogleJobsConfig,

    /// Tier 2 settings.
    #[serde(default)]
    pub jsearch: JSearchConfig,

    /// Tier 3 settings.
    #[serde(default)]
    pub niche: NicheConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub run: RunConfig,
}

impl AppConfig {
    /// Reject configs the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.search.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(JobsweepError::validation("[search] keywords must not be empty"));
        }
        if self.acquisition.concurrency == 0 {
            return Err(JobsweepError::validation(
                "[acquisition] concurrency must be at least 1",
            ));
        }
        if self.registry.backend == RegistryBackend::Remote && self.registry.url.is_none() {
            return Err(JobsweepError::validation(
                "[registry] backend = \"remote\" requires a url",
            ));
        }
        Ok(())
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    #[serde(default = "default_locations")]
    pub locations: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            locations: default_locations(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}
fn default_locations() -> Vec<String> {
    DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect()
}

/// `[acquisition]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Maximum combinations searched in parallel within one tier.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// HTTP timeout for source requests.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_concurrency() -> u32 {
    2
}
fn default_http_timeout() -> u64 {
    30
}

/// `[google_jobs]` section (tier 1, SerpAPI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleJobsConfig {
    /// Name of the env var holding the SerpAPI key.
    #[serde(default = "default_serpapi_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_serpapi_endpoint")]
    pub endpoint: String,

    /// SerpAPI `chips` value, e.g. `date_posted:week`.
    #[serde(default = "default_serp_date_filter")]
    pub date_filter: String,

    /// Pages per keyword × location (10 results each).
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_serp_page_delay")]
    pub page_delay_ms: u64,
}

impl Default for GoogleJobsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_serpapi_key_env(),
            endpoint: default_serpapi_endpoint(),
            date_filter: default_serp_date_filter(),
            max_pages: default_max_pages(),
            page_delay_ms: default_serp_page_delay(),
        }
    }
}

fn default_serpapi_key_env() -> String {
    "SERPAPI_API_KEY".into()
}
fn default_serpapi_endpoint() -> String {
    "https://serpapi.com/search.json".into()
}
fn default_serp_date_filter() -> String {
    "date_posted:week".into()
}
fn default_max_pages() -> u32 {
    5
}
fn default_serp_page_delay() -> u64 {
    1500
}

/// `[jsearch]` section (tier 2, RapidAPI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSearchConfig {
    /// Name of the env var holding the RapidAPI key.
    #[serde(default = "default_rapidapi_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_jsearch_host")]
    pub host: String,

    #[serde(default = "default_jsearch_endpoint")]
    pub endpoint: String,

    /// `today`, `3days`, `week`, or `month`.
    #[serde(default = "default_jsearch_date_posted")]
    pub date_posted: String,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Only the first N configured locations are searched, to conserve quota.
    #[serde(default = "default_location_limit")]
    pub location_limit: usize,

    #[serde(default = "default_jsearch_page_delay")]
    pub page_delay_ms: u64,

    /// Pause after a 429 before continuing.
    #[serde(default = "default_rate_limit_cooldown")]
    pub rate_limit_cooldown_secs: u64,

    /// 429 cooldowns allowed per keyword × location before giving up on it.
    #[serde(default = "default_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl Default for JSearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_rapidapi_key_env(),
            host: default_jsearch_host(),
            endpoint: default_jsearch_endpoint(),
            date_posted: default_jsearch_date_posted(),
            max_pages: default_max_pages(),
            location_limit: default_location_limit(),
            page_delay_ms: default_jsearch_page_delay(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown(),
            max_rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

fn default_rapidapi_key_env() -> String {
    "RAPIDAPI_KEY".into()
}
fn default_jsearch_host() -> String {
    "jsearch.p.rapidapi.com".into()
}
fn default_jsearch_endpoint() -> String {
    "https://jsearch.p.rapidapi.com/search".into()
}
fn default_jsearch_date_posted() -> String {
    "week".into()
}
fn default_location_limit() -> usize {
    5
}
fn default_jsearch_page_delay() -> u64 {
    2000
}
fn default_rate_limit_cooldown() -> u64 {
    60
}
fn default_rate_limit_retries() -> u32 {
    1
}

/// `[niche]` section (tier 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicheConfig {
    #[serde(default = "default_boards")]
    pub boards: Vec<BoardConfig>,

    /// A card title must contain one of these (lower-case) to count as relevant.
    #[serde(default = "default_title_terms")]
    pub title_terms: Vec<String>,

    /// Pause between boards.
    #[serde(default = "default_site_delay")]
    pub site_delay_ms: u64,

    #[serde(default = "default_max_cards")]
    pub max_cards_per_board: usize,
}

impl Default for NicheConfig {
    fn default() -> Self {
        Self {
            boards: default_boards(),
            title_terms: default_title_terms(),
            site_delay_ms: default_site_delay(),
            max_cards_per_board: default_max_cards(),
        }
    }
}

/// `[[niche.boards]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board name; also selects the card adapter (`jobright.ai`, ...).
    pub name: String,
    /// Search URL with `{keyword}` (plus-encoded) or `{keyword_slug}` placeholders.
    pub url_template: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_boards() -> Vec<BoardConfig> {
    let board = |name: &str, url_template: &str, enabled: bool| BoardConfig {
        name: name.into(),
        url_template: url_template.into(),
        enabled,
    };
    vec![
        board(
            "jobright.ai",
            "https://jobright.ai/jobs?searchKeyword={keyword}&location=United+States",
            true,
        ),
        board(
            "accountingcrossing.com",
            "https://www.accountingcrossing.com/jobs/q-{keyword_slug}-jobs.html",
            true,
        ),
        board(
            "monster.com",
            "https://www.monster.com/jobs/search?q={keyword}&where=United+States",
            false,
        ),
        board(
            "roberthalf.com",
            "https://www.roberthalf.com/us/en/jobs?query={keyword}",
            false,
        ),
        board(
            "astoncarter.com",
            "https://www.astoncarter.com/en/jobs?k={keyword}&l=United+States",
            false,
        ),
    ]
}
fn default_title_terms() -> Vec<String> {
    ["account", "payable", "ap ", "a/p"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_site_delay() -> u64 {
    3000
}
fn default_max_cards() -> usize {
    50
}

/// Registry storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryBackend {
    /// Embedded libSQL file.
    #[default]
    Local,
    /// Networked libSQL / Turso database.
    Remote,
    /// In-process only; forgets everything on exit.
    Memory,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub backend: RegistryBackend,

    /// Database file for the local backend.
    #[serde(default = "default_registry_path")]
    pub path: String,

    /// Database URL for the remote backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name of the env var holding the remote auth token.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::default(),
            path: default_registry_path(),
            url: None,
            auth_token_env: default_auth_token_env(),
        }
    }
}

fn default_registry_path() -> String {
    "data/jobs_dedup.db".into()
}
fn default_auth_token_env() -> String {
    "LIBSQL_AUTH_TOKEN".into()
}

/// `[sink]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Workbook directory receiving the master and daily sheets.
    #[serde(default = "default_sink_dir")]
    pub output_dir: String,

    #[serde(default = "default_master_sheet")]
    pub master_sheet: String,

    /// Daily tab prefix, e.g. `DailyJobs-` → `DailyJobs-25Feb2026`.
    #[serde(default = "default_daily_prefix")]
    pub daily_prefix: String,

    /// Rows per append.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause before the single retry of a failed append.
    #[serde(default = "default_retry_cooldown")]
    pub retry_cooldown_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            output_dir: default_sink_dir(),
            master_sheet: default_master_sheet(),
            daily_prefix: default_daily_prefix(),
            batch_size: default_batch_size(),
            retry_cooldown_ms: default_retry_cooldown(),
        }
    }
}

fn default_sink_dir() -> String {
    "data/sheets".into()
}
fn default_master_sheet() -> String {
    "MasterCompanies".into()
}
fn default_daily_prefix() -> String {
    "DailyJobs-".into()
}
fn default_batch_size() -> usize {
    100
}
fn default_retry_cooldown() -> u64 {
    60_000
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hard wall-clock budget for one run; 0 disables it.
    #[serde(default = "default_run_timeout")]
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_run_timeout(),
        }
    }
}

fn default_run_timeout() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.jobsweep/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| JobsweepError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.jobsweep/jobsweep.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| JobsweepError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        JobsweepError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| JobsweepError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| JobsweepError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| JobsweepError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var; `None` when unset or empty.
pub fn resolve_secret(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}
