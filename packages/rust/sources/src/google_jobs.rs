//! Tier 1: Google Jobs through SerpAPI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use jobsweep_shared::{
    GoogleJobsConfig, GoogleJobsPosting, JobsweepError, RawRecord, Result, Tier,
};

use crate::{JobSource, USER_AGENT, http_client, parse_items};

/// Results per SerpAPI page.
const PAGE_SIZE: u32 = 10;

/// Location used when a combination has none.
const DEFAULT_LOCATION: &str = "United States";

/// Paginated Google Jobs search, one keyword × location at a time.
pub struct GoogleJobsSource {
    client: Client,
    api_key: String,
    config: GoogleJobsConfig,
}

impl GoogleJobsSource {
    pub fn new(api_key: impl Into<String>, config: GoogleJobsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, USER_AGENT)?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Fetch one page; an empty vec means no more results.
    async fn fetch_page(
        &self,
        keyword: &str,
        location: &str,
        page: u32,
    ) -> Result<Vec<GoogleJobsPosting>> {
        let start = (page * PAGE_SIZE).to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("engine", "google_jobs"),
            ("q", keyword),
            ("location", location),
            ("hl", "en"),
            ("gl", "us"),
            ("chips", self.config.date_filter.as_str()),
            ("api_key", self.api_key.as_str()),
        ];
        if page > 0 {
            query.push(("start", start.as_str()));
        }

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| JobsweepError::Network(format!("serpapi: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(JobsweepError::rate_limited("serpapi"));
        }
        if !status.is_success() {
            return Err(JobsweepError::Network(format!("serpapi: HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| JobsweepError::parse(format!("serpapi response: {e}")))?;

        let items = match body.get("jobs_results") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            _ => match body.get("error").and_then(|e| e.as_str()) {
                // SerpAPI reports an exhausted search as an error string.
                Some(msg) if msg.contains("hasn't returned any results") => Vec::new(),
                Some(msg) => return Err(JobsweepError::Network(format!("serpapi: {msg}"))),
                None => Vec::new(),
            },
        };

        let mut postings: Vec<GoogleJobsPosting> = parse_items(items, "serpapi");
        for posting in &mut postings {
            posting.search_keyword = keyword.to_string();
            posting.search_location = location.to_string();
        }
        Ok(postings)
    }
}

#[async_trait]
impl JobSource for GoogleJobsSource {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn tier(&self) -> Tier {
        Tier::Primary
    }

    #[instrument(skip_all, fields(keyword = %keyword, location = ?location))]
    async fn search(&self, keyword: &str, location: Option<&str>) -> Result<Vec<RawRecord>> {
        let location = location.unwrap_or(DEFAULT_LOCATION);
        let mut records = Vec::new();

        for page in 0..self.config.max_pages {
            if page > 0 && self.config.page_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }

            match self.fetch_page(keyword, location, page).await {
                Ok(postings) if postings.is_empty() => {
                    debug!(page = page + 1, "no more results");
                    break;
                }
                Ok(postings) => {
                    debug!(page = page + 1, found = postings.len(), "fetched page");
                    records.extend(postings.into_iter().map(RawRecord::GoogleJobs));
                }
                Err(e) if !records.is_empty() => {
                    warn!(page = page + 1, error = %e, "page failed, keeping earlier pages");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        info!(keyword, location, found = records.len(), "google jobs search complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> GoogleJobsSource {
        let config = GoogleJobsConfig {
            endpoint: format!("{}/search.json", server.uri()),
            page_delay_ms: 0,
            max_pages: 3,
            ..GoogleJobsConfig::default()
        };
        GoogleJobsSource::new("test-key", config, Duration::from_secs(5)).unwrap()
    }

    fn page_of(n: usize, offset: usize) -> serde_json::Value {
        let jobs: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "title": "Accounts Payable Clerk",
                    "company_name": format!("Company {}", offset + i),
                    "location": "Austin, TX",
                    "apply_options": [{"title": "Indeed", "link": format!("https://indeed.example/{}", offset + i)}]
                })
            })
            .collect();
        serde_json::json!({ "jobs_results": jobs })
    }

    #[tokio::test]
    async fn paginates_until_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("start", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "Accounts Payable"))
            .and(query_param("engine", "google_jobs"))
            .and(query_param("chips", "date_posted:week"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(10, 0)))
            .mount(&server)
            .await;

        let records = source(&server)
            .search("Accounts Payable", Some("Austin, TX"))
            .await
            .unwrap();
        assert_eq!(records.len(), 10);

        match &records[0] {
            RawRecord::GoogleJobs(posting) => {
                assert_eq!(posting.search_keyword, "Accounts Payable");
                assert_eq!(posting.search_location, "Austin, TX");
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[tokio::test]
    async fn later_page_failure_keeps_earlier_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("start", "10"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(4, 0)))
            .mount(&server)
            .await;

        let records = source(&server).search("Accounts Payable", None).await.unwrap();
        assert_eq!(records.len(), 4);
    }

    #[tokio::test]
    async fn first_page_failure_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = source(&server)
            .search("Accounts Payable", None)
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn stops_at_max_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(10, 0)))
            .expect(3)
            .mount(&server)
            .await;

        let records = source(&server).search("Accounts Payable", None).await.unwrap();
        assert_eq!(records.len(), 30);
    }
}
