//! Tier 2: JSearch through RapidAPI.
//!
//! Metered: only the first few configured locations are searched, and a 429
//! triggers a cooldown before the same page is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use jobsweep_shared::{JSearchConfig, JSearchPosting, JobsweepError, RawRecord, Result, Tier};

use crate::{JobSource, LocationScope, USER_AGENT, http_client, parse_items};

const DEFAULT_LOCATION: &str = "United States";

pub struct JSearchSource {
    client: Client,
    api_key: String,
    config: JSearchConfig,
}

impl JSearchSource {
    pub fn new(api_key: impl Into<String>, config: JSearchConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, USER_AGENT)?,
            api_key: api_key.into(),
            config,
        })
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<Vec<JSearchPosting>> {
        let page = page.to_string();
        let params = [
            ("query", query),
            ("page", page.as_str()),
            ("num_pages", "1"),
            ("date_posted", self.config.date_posted.as_str()),
            ("country", "us"),
            ("language", "en"),
        ];

        let response = self
            .client
            .get(&self.config.endpoint)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.config.host)
            .query(&params)
            .send()
            .await
            .map_err(|e| JobsweepError::Network(format!("jsearch: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(JobsweepError::rate_limited("jsearch"));
        }
        if !status.is_success() {
            return Err(JobsweepError::Network(format!("jsearch: HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| JobsweepError::parse(format!("jsearch response: {e}")))?;

        let items = match body.get("data") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(parse_items(items, "jsearch"))
    }
}

#[async_trait]
impl JobSource for JSearchSource {
    fn name(&self) -> &str {
        "jsearch"
    }

    fn tier(&self) -> Tier {
        Tier::Supplementary
    }

    fn location_scope(&self) -> LocationScope {
        LocationScope::First(self.config.location_limit)
    }

    #[instrument(skip_all, fields(keyword = %keyword, location = ?location))]
    async fn search(&self, keyword: &str, location: Option<&str>) -> Result<Vec<RawRecord>> {
        let query = format!("{keyword} in {}", location.unwrap_or(DEFAULT_LOCATION));
        let mut records = Vec::new();
        let mut rate_limit_hits = 0;
        let mut page = 1;

        while page <= self.config.max_pages {
            match self.fetch_page(&query, page).await {
                Ok(postings) if postings.is_empty() => {
                    debug!(page, "no more results");
                    break;
                }
                Ok(postings) => {
                    debug!(page, found = postings.len(), "fetched page");
                    records.extend(postings.into_iter().map(|mut posting| {
                        posting.search_keyword = keyword.to_string();
                        RawRecord::JSearch(posting)
                    }));
                    page += 1;
                    if page <= self.config.max_pages && self.config.page_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    if rate_limit_hits >= self.config.max_rate_limit_retries {
                        warn!(page, "rate limit persists, ending this search");
                        if records.is_empty() {
                            return Err(e);
                        }
                        break;
                    }
                    rate_limit_hits += 1;
                    warn!(
                        page,
                        cooldown_secs = self.config.rate_limit_cooldown_secs,
                        "rate limited, cooling down"
                    );
                    tokio::time::sleep(Duration::from_secs(self.config.rate_limit_cooldown_secs))
                        .await;
                }
                Err(e) if !records.is_empty() => {
                    warn!(page, error = %e, "page failed, keeping earlier pages");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        info!(query = %query, found = records.len(), "jsearch search complete");
        Ok(records)
    }
}
