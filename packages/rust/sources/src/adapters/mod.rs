//! Board adapter trait and built-in adapters for niche job boards.
//!
//! Each adapter knows where one board keeps its listing cards. Card text is
//! then parsed by the shared, best-effort [`parse_job_card`].

mod accountingcrossing;
mod generic;
mod jobright;
mod monster;

use std::collections::HashSet;

use jobsweep_shared::BoardCard;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub use accountingcrossing::AccountingCrossingAdapter;
pub use generic::GenericBoardAdapter;
pub use jobright::JobrightAdapter;
pub use monster::MonsterAdapter;

/// Cap on the title and company taken from a card.
const CARD_FIELD_LIMIT: usize = 200;

/// Cap on the description snippet assembled from remaining card lines.
const SNIPPET_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Text content and link of one listing card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardText {
    /// Trimmed, non-empty text lines in document order.
    pub lines: Vec<String>,
    /// Link target as written in the page (may be relative).
    pub href: Option<String>,
}

/// Locates listing cards on one board's search results page.
pub trait BoardAdapter: Send + Sync {
    /// Whether this adapter handles the board with the given configured name.
    fn matches(&self, board_name: &str) -> bool;

    /// CSS selector for listing cards.
    fn card_selector(&self) -> &'static str;

    /// Selector tried when [`card_selector`](Self::card_selector) finds nothing.
    fn fallback_selector(&self) -> Option<&'static str> {
        None
    }

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;

    /// Collect cards in document order. Cards nested inside another matched
    /// card are skipped.
    fn extract_cards(&self, doc: &Html) -> Vec<CardText> {
        let cards = select_cards(doc, self.card_selector());
        if !cards.is_empty() {
            return cards;
        }
        self.fallback_selector()
            .map(|sel| select_cards(doc, sel))
            .unwrap_or_default()
    }
}

fn select_cards(doc: &Html, selector: &str) -> Vec<CardText> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };

    let matched: Vec<ElementRef<'_>> = doc.select(&sel).collect();
    let ids: HashSet<_> = matched.iter().map(|el| el.id()).collect();

    matched
        .into_iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .map(card_text)
        .filter(|card| !card.lines.is_empty())
        .collect()
}

fn card_text(el: ElementRef<'_>) -> CardText {
    let lines = el
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let href = if el.value().name() == "a" {
        el.value().attr("href").map(str::to_string)
    } else {
        Selector::parse("a[href]").ok().and_then(|link_sel| {
            el.select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
    };

    CardText { lines, href }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds board adapters in priority order, generic last.
pub struct BoardAdapterRegistry {
    adapters: Vec<Box<dyn BoardAdapter>>,
    fallback: GenericBoardAdapter,
}

impl BoardAdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(JobrightAdapter),
                Box::new(AccountingCrossingAdapter),
                Box::new(MonsterAdapter),
            ],
            fallback: GenericBoardAdapter,
        }
    }

    /// Pick the adapter for a board. Always returns one.
    pub fn for_board(&self, board_name: &str) -> &dyn BoardAdapter {
        self.adapters
            .iter()
            .find(|adapter| adapter.matches(board_name))
            .map(|adapter| adapter.as_ref())
            .unwrap_or(&self.fallback)
    }
}

impl Default for BoardAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Card parsing
// ---------------------------------------------------------------------------

/// Parse card lines into a posting.
///
/// Expected layout is title, company, location, then free text. When the
/// first line does not look like a relevant title the first two lines are
/// swapped. Cards with fewer than two lines or no relevant title yield `None`.
pub fn parse_job_card(
    card: &CardText,
    page_url: &Url,
    board: &str,
    keyword: &str,
    title_terms: &[String],
) -> Option<BoardCard> {
    if card.lines.len() < 2 {
        return None;
    }

    let mut title = card.lines[0].as_str();
    let mut company = card.lines[1].as_str();
    if !is_relevant_title(title, title_terms) {
        std::mem::swap(&mut title, &mut company);
        if !is_relevant_title(title, title_terms) {
            return None;
        }
    }

    let location = card.lines.get(2).cloned().unwrap_or_default();
    let mut parts = location.split(',').map(str::trim);
    let city = parts.next().unwrap_or_default().to_string();
    let state = parts.next().unwrap_or_default().to_string();

    let snippet = card.lines.iter().skip(3).cloned().collect::<Vec<_>>().join(" ");

    let url = card
        .href
        .as_deref()
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| page_url.join(href.trim()).ok())
        .map(|u| u.to_string())
        .unwrap_or_default();

    Some(BoardCard {
        title: take_chars(title, CARD_FIELD_LIMIT),
        company: take_chars(company, CARD_FIELD_LIMIT),
        location,
        city,
        state,
        snippet: take_chars(&snippet, SNIPPET_LIMIT),
        url,
        board: board.to_string(),
        search_keyword: keyword.to_string(),
    })
}

fn is_relevant_title(title: &str, terms: &[String]) -> bool {
    let lower = title.to_lowercase();
    terms.iter().any(|term| lower.contains(term.as_str()))
}

fn take_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
