//! jobright.ai adapter.
//!
//! Listings render as card components; older layouts only expose bare
//! `/jobs/` links, which the fallback picks up.

use super::BoardAdapter;

pub struct JobrightAdapter;

impl BoardAdapter for JobrightAdapter {
    fn matches(&self, board_name: &str) -> bool {
        board_name.contains("jobright")
    }

    fn card_selector(&self) -> &'static str {
        r#"[class*="job-card"], [class*="JobCard"], [data-testid*="job"]"#
    }

    fn fallback_selector(&self) -> Option<&'static str> {
        Some(r#"a[href*="/jobs/"]"#)
    }

    fn name(&self) -> &str {
        "jobright"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn falls_back_to_job_links() {
        let html = r#"<html><body>
            <a href="/jobs/info/abc">Accounts Payable Specialist<br>Initech<br>Remote</a>
            <a href="/about">About</a>
        </body></html>"#;
        let cards = JobrightAdapter.extract_cards(&Html::parse_document(html));
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].lines, vec!["Accounts Payable Specialist", "Initech", "Remote"]);
        assert_eq!(cards[0].href.as_deref(), Some("/jobs/info/abc"));
    }
}
