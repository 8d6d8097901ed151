//! Tier 3: niche job boards.
//!
//! Keyword-only. Each enabled board's search page is fetched, its listing
//! cards located by a [`BoardAdapter`](crate::BoardAdapter), and the cards
//! parsed best-effort. One failing board never stops the others.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use jobsweep_shared::{BoardCard, BoardConfig, JobsweepError, NicheConfig, RawRecord, Result, Tier};

use crate::adapters::{BoardAdapterRegistry, parse_job_card};
use crate::{JobSource, LocationScope, http_client};

/// Boards serve reduced or empty pages to non-browser agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct NicheBoardSource {
    client: Client,
    boards: Vec<BoardConfig>,
    title_terms: Vec<String>,
    site_delay: Duration,
    max_cards: usize,
    adapters: BoardAdapterRegistry,
}

impl NicheBoardSource {
    /// Build from config; disabled boards are dropped.
    pub fn new(config: &NicheConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, BROWSER_USER_AGENT)?,
            boards: config.boards.iter().filter(|b| b.enabled).cloned().collect(),
            title_terms: config
                .title_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            site_delay: Duration::from_millis(config.site_delay_ms),
            max_cards: config.max_cards_per_board,
            adapters: BoardAdapterRegistry::new(),
        })
    }

    /// Whether any board is enabled.
    pub fn has_boards(&self) -> bool {
        !self.boards.is_empty()
    }

    async fn scrape_board(&self, board: &BoardConfig, keyword: &str) -> Result<Vec<BoardCard>> {
        let page_url = Url::parse(&render_search_url(&board.url_template, keyword))
            .map_err(|e| JobsweepError::config(format!("board {}: bad url_template: {e}", board.name)))?;

        debug!(board = %board.name, url = %page_url, "fetching board");
        let response = self
            .client
            .get(page_url.as_str())
            .send()
            .await
            .map_err(|e| JobsweepError::Network(format!("{}: {e}", board.name)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobsweepError::Network(format!("{}: HTTP {status}", board.name)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| JobsweepError::Network(format!("{}: body read failed: {e}", board.name)))?;

        Ok(self.extract(&body, &page_url, board, keyword))
    }

    fn extract(&self, body: &str, page_url: &Url, board: &BoardConfig, keyword: &str) -> Vec<BoardCard> {
        let doc = Html::parse_document(body);
        let adapter = self.adapters.for_board(&board.name);

        adapter
            .extract_cards(&doc)
            .iter()
            .take(self.max_cards)
            .filter_map(|card| parse_job_card(card, page_url, &board.name, keyword, &self.title_terms))
            .collect()
    }
}

/// Fill `{keyword}` (form-encoded, spaces as `+`) and `{keyword_slug}`
/// (lower-case, spaces as `-`).
pub fn render_search_url(template: &str, keyword: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    let slug = keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    template
        .replace("{keyword_slug}", &slug)
        .replace("{keyword}", &encoded)
}

#[async_trait]
impl JobSource for NicheBoardSource {
    fn name(&self) -> &str {
        "niche-boards"
    }

    fn tier(&self) -> Tier {
        Tier::Niche
    }

    fn location_scope(&self) -> LocationScope {
        LocationScope::KeywordOnly
    }

    #[instrument(skip_all, fields(keyword = %keyword))]
    async fn search(&self, keyword: &str, _location: Option<&str>) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();

        for (i, board) in self.boards.iter().enumerate() {
            if i > 0 && !self.site_delay.is_zero() {
                tokio::time::sleep(self.site_delay).await;
            }

            match self.scrape_board(board, keyword).await {
                Ok(cards) => {
                    info!(board = %board.name, found = cards.len(), "board scraped");
                    records.extend(cards.into_iter().map(RawRecord::NicheBoard));
                }
                Err(e) => warn!(board = %board.name, error = %e, "board failed, skipping"),
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn board(name: &str, url_template: String, enabled: bool) -> BoardConfig {
        BoardConfig {
            name: name.into(),
            url_template,
            enabled,
        }
    }

    fn config(boards: Vec<BoardConfig>) -> NicheConfig {
        NicheConfig {
            boards,
            site_delay_ms: 0,
            ..NicheConfig::default()
        }
    }

    #[test]
    fn renders_keyword_placeholders() {
        assert_eq!(
            render_search_url("https://b.example/jobs?q={keyword}", "Accounts Payable Clerk"),
            "https://b.example/jobs?q=Accounts+Payable+Clerk"
        );
        assert_eq!(
            render_search_url("https://b.example/jobs/q-{keyword_slug}-jobs.html", "Accounts Payable"),
            "https://b.example/jobs/q-accounts-payable-jobs.html"
        );
    }

    #[tokio::test]
    async fn scrapes_enabled_boards_and_skips_failures() {
        let server = MockServer::start().await;

        let listing = r#"<html><body>
            <div class="job-card"><a href="/jobs/1">Accounts Payable Clerk</a><p>Acme</p><p>Austin, TX</p></div>
            <div class="job-card"><a href="/jobs/2">Marketing Lead</a><p>Globex</p><p>Remote</p></div>
            <div class="job-card"><p>Initech</p><a href="/jobs/3">AP Specialist</a><p>Denver, CO</p></div>
        </body></html>"#;

        Mock::given(method("GET"))
            .and(path("/jobs"))
            .and(query_param("searchKeyword", "Accounts Payable"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let boards = vec![
            board("broken.example", format!("{}/broken?q={{keyword}}", server.uri()), true),
            board(
                "jobright.ai",
                format!("{}/jobs?searchKeyword={{keyword}}", server.uri()),
                true,
            ),
            board("monster.com", format!("{}/never", server.uri()), false),
        ];

        let source = NicheBoardSource::new(&config(boards), Duration::from_secs(5)).unwrap();
        let records = source.search("Accounts Payable", None).await.unwrap();

        assert_eq!(records.len(), 2);
        let cards: Vec<&BoardCard> = records
            .iter()
            .map(|r| match r {
                RawRecord::NicheBoard(card) => card,
                other => panic!("unexpected record {other:?}"),
            })
            .collect();

        assert_eq!(cards[0].title, "Accounts Payable Clerk");
        assert_eq!(cards[0].company, "Acme");
        assert_eq!(cards[0].url, format!("{}/jobs/1", server.uri()));
        assert_eq!(cards[1].title, "AP Specialist");
        assert_eq!(cards[1].company, "Initech");
        assert_eq!(cards[1].board, "jobright.ai");
    }

    #[tokio::test]
    async fn caps_cards_per_board() {
        let server = MockServer::start().await;

        let cards: String = (0..10)
            .map(|i| format!(r#"<div class="job-card"><a href="/jobs/{i}">AP Clerk {i}</a><p>Co {i}</p></div>"#))
            .collect();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("<html><body>{cards}</body></html>")))
            .mount(&server)
            .await;

        let mut niche = config(vec![board("jobright.ai", format!("{}/jobs", server.uri()), true)]);
        niche.max_cards_per_board = 3;

        let source = NicheBoardSource::new(&niche, Duration::from_secs(5)).unwrap();
        let records = source.search("Accounts Payable", None).await.unwrap();
        assert_eq!(records.len(), 3);
    }
}
