use std::sync::{Arc, LazyLock};

use regex::Regex;
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};

use super::text::{clean_headline, inner_text};
use super::{fetch_page, NewsFuture, NewsQuery, NewsSource};
use crate::http_client::{HttpClient, DEFAULT_TIMEOUT_MS};
use crate::source_error::SourceError;
use crate::{NewsItem, UtcDateTime};

const SEARCH_URL: &str = "https://news.google.com/rss/search";
const MIN_HEADLINE_LEN: usize = 10;

static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid regex"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").expect("valid regex"));
static PUB_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").expect("valid regex"));

/// Google News RSS search.
#[derive(Clone)]
pub struct GoogleNews {
    http: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl GoogleNews {
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

    pub fn search_url(query: &NewsQuery) -> String {
        format!(
            "{SEARCH_URL}?q={}&hl=en-US&gl=US&ceid=US:en",
            urlencoding::encode(&format!("{} stock news", query.company_name))
        )
    }
}

impl NewsSource for GoogleNews {
    fn name(&self) -> &'static str {
        "Google News"
    }

    fn fetch<'a>(&'a self, query: &'a NewsQuery, limit: usize) -> NewsFuture<'a> {
        Box::pin(async move {
            let url = Self::search_url(query);
            let body = fetch_page(self.http.as_ref(), &url, self.timeout_ms).await?;
            parse_feed(&body, self.name(), limit)
        })
    }
}

fn parse_feed(body: &str, source: &str, limit: usize) -> Result<Vec<NewsItem>, SourceError> {
    if !body.contains("<rss") && !body.contains("<channel") {
        return Err(SourceError::invalid_response("response is not an RSS feed"));
    }

    let items = ITEM
        .captures_iter(body)
        .filter_map(|item| {
            let item = item.get(1)?.as_str();
            let headline = clean_headline(&inner_text(TITLE.captures(item)?.get(1)?.as_str()));
            if headline.chars().count() <= MIN_HEADLINE_LEN {
                return None;
            }

            let url = LINK
                .captures(item)
                .and_then(|link| link.get(1))
                .map(|link| inner_text(link.as_str()))
                .unwrap_or_default();
            let mut news = NewsItem::new(headline, source, url);
            if let Some(published_at) = PUB_DATE
                .captures(item)
                .and_then(|date| date.get(1))
                .and_then(|date| parse_rfc2822(&inner_text(date.as_str())))
            {
                news = news.with_published_at(published_at);
            }
            Some(news)
        })
        .take(limit)
        .collect();

    Ok(items)
}

fn parse_rfc2822(value: &str) -> Option<UtcDateTime> {
    let parsed = OffsetDateTime::parse(value, &Rfc2822).ok()?;
    UtcDateTime::from_offset_datetime(parsed.to_offset(UtcOffset::UTC)).ok()
}
