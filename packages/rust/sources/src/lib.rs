//! Job source connectors and the tiered acquisition orchestrator.
//!
//! This crate provides:
//! - [`JobSource`], the connector seam every tier implements
//! - [`GoogleJobsSource`] (tier 1), [`JSearchSource`] (tier 2), and
//!   [`NicheBoardSource`] (tier 3)
//! - [`adapters`], per-board card locators for niche boards
//! - [`Orchestrator`], bounded-parallel fan-out over keyword × location

pub mod adapters;
pub mod engine;
pub mod google_jobs;
pub mod jsearch;
pub mod niche;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::warn;

use jobsweep_shared::{JobsweepError, RawRecord, Result, Tier};

pub use adapters::{BoardAdapter, BoardAdapterRegistry, CardText, parse_job_card};
pub use engine::{AcquisitionPlan, AcquisitionReport, Orchestrator, TierSummary};
pub use google_jobs::GoogleJobsSource;
pub use jsearch::JSearchSource;
pub use niche::NicheBoardSource;

/// User-Agent for API requests.
const USER_AGENT: &str = concat!("jobsweep/", env!("CARGO_PKG_VERSION"));

/// Which locations a source fans out over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationScope {
    /// Every configured location.
    All,
    /// Only the first N configured locations.
    First(usize),
    /// One search per keyword, no location.
    KeywordOnly,
}

/// A connector to one acquisition source.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    fn tier(&self) -> Tier;

    fn location_scope(&self) -> LocationScope {
        LocationScope::All
    }

    /// Fetch every posting for one keyword × location combination.
    async fn search(&self, keyword: &str, location: Option<&str>) -> Result<Vec<RawRecord>>;
}

/// Build an HTTP client with the shared defaults.
pub(crate) fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| JobsweepError::Network(format!("failed to build HTTP client: {e}")))
}

/// Deserialize result items one by one, skipping malformed entries.
pub(crate) fn parse_items<T: DeserializeOwned>(
    items: Vec<serde_json::Value>,
    source: &str,
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(source, error = %e, "skipping malformed result item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsweep_shared::GoogleJobsPosting;

    #[test]
    fn malformed_items_are_skipped() {
        let items = vec![
            serde_json::json!({"title": "AP Clerk", "company_name": "Acme"}),
            serde_json::json!({"title": 42}),
            serde_json::json!("not an object"),
        ];
        let parsed: Vec<GoogleJobsPosting> = parse_items(items, "test");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].company_name.as_deref(), Some("Acme"));
    }
}
