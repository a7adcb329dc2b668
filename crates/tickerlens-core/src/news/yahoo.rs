use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::text::{attribute, clean_headline, inner_text};
use super::{fetch_page, NewsFuture, NewsQuery, NewsSource};
use crate::http_client::{HttpClient, DEFAULT_TIMEOUT_MS};
use crate::source_error::SourceError;
use crate::NewsItem;

const BASE_URL: &str = "https://finance.yahoo.com";
const MIN_HEADLINE_LEN: usize = 10;
const MIN_FALLBACK_LEN: usize = 20;
const FALLBACK_SCAN: usize = 10;
const FINANCE_KEYWORDS: [&str; 6] = ["stock", "shares", "earnings", "revenue", "profit", "loss"];

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<h[34]\b[^>]*>)(.*?)</h[34]>").expect("valid regex")
});
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("valid regex"));

/// Headlines from the Yahoo Finance quote news page.
#[derive(Clone)]
pub struct YahooFinanceNews {
    http: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl YahooFinanceNews {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn page_url(query: &NewsQuery) -> String {
        format!(
            "{BASE_URL}/quote/{}/news",
            urlencoding::encode(query.ticker.symbol())
        )
    }
}

impl NewsSource for YahooFinanceNews {
    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn fetch<'a>(&'a self, query: &'a NewsQuery, limit: usize) -> NewsFuture<'a> {
        Box::pin(async move {
            let url = Self::page_url(query);
            let body = fetch_page(self.http.as_ref(), &url, self.timeout_ms).await?;
            Ok(parse_page(&body, self.name(), &url, limit))
        })
    }
}

struct Heading {
    class: String,
    text: String,
    href: Option<String>,
}

fn headings(body: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(body)
        .filter_map(|caps| {
            let open = caps.get(1)?.as_str();
            let content = caps.get(2)?.as_str();
            Some(Heading {
                class: attribute(open, "class").unwrap_or_default(),
                text: inner_text(content),
                href: ANCHOR
                    .find(content)
                    .and_then(|anchor| attribute(anchor.as_str(), "href")),
            })
        })
        .collect()
}

fn parse_page(body: &str, source: &str, page_url: &str, limit: usize) -> Vec<NewsItem> {
    let headings = headings(body);
    let to_item = |heading: &Heading| {
        let url = match heading.href.as_deref() {
            Some(href) if href.starts_with('/') => format!("{BASE_URL}{href}"),
            Some(href) if !href.is_empty() => href.to_owned(),
            _ => page_url.to_owned(),
        };
        NewsItem::new(clean_headline(&heading.text), source, url)
    };

    let classed: Vec<NewsItem> = headings
        .iter()
        .filter(|heading| heading.class.to_lowercase().contains("headline"))
        .filter(|heading| heading.text.chars().count() > MIN_HEADLINE_LEN)
        .take(limit)
        .map(to_item)
        .collect();
    if !classed.is_empty() {
        return classed;
    }

    headings
        .iter()
        .take(FALLBACK_SCAN)
        .filter(|heading| heading.text.chars().count() > MIN_FALLBACK_LEN)
        .filter(|heading| {
            let lower = heading.text.to_lowercase();
            FINANCE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .take(limit)
        .map(to_item)
        .collect()
}
