use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::text::{attribute, clean_headline, inner_text, normalize_key};
use super::{fetch_page, NewsFuture, NewsQuery, NewsSource};
use crate::http_client::{HttpClient, DEFAULT_TIMEOUT_MS};
use crate::NewsItem;

const SEARCH_URL: &str = "https://www.bing.com/news/search";
const MIN_HEADLINE_LEN: usize = 15;

static DIV_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<div\b[^>]*>").expect("valid regex"));
static TITLE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<(?:a|h2|h3|h4)\b[^>]*>)(.*?)</(?:a|h2|h3|h4)>").expect("valid regex")
});

/// Headlines from the Bing News search page.
#[derive(Clone)]
pub struct BingNews {
    http: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl BingNews {
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
            "{SEARCH_URL}?q={}",
            urlencoding::encode(&format!(
                "{} {} news",
                query.company_name,
                query.ticker.base_symbol()
            ))
        )
    }
}

impl NewsSource for BingNews {
    fn name(&self) -> &'static str {
        "Bing News"
    }

    fn fetch<'a>(&'a self, query: &'a NewsQuery, limit: usize) -> NewsFuture<'a> {
        Box::pin(async move {
            let url = Self::search_url(query);
            let body = fetch_page(self.http.as_ref(), &url, self.timeout_ms).await?;
            Ok(parse_page(&body, self.name(), limit))
        })
    }
}

/// Start offsets and start tags of every `div` whose class mentions "news".
fn news_cards(body: &str) -> Vec<(usize, &str)> {
    DIV_OPEN
        .find_iter(body)
        .filter(|tag| {
            attribute(tag.as_str(), "class")
                .is_some_and(|class| class.to_lowercase().contains("news"))
        })
        .map(|tag| (tag.start(), tag.as_str()))
        .collect()
}

fn card_item(open_tag: &str, card: &str, source: &str) -> Option<NewsItem> {
    // Cards on the current layout carry the story in data attributes.
    if let Some(title) = attribute(open_tag, "data-title") {
        let headline = clean_headline(&title);
        if headline.chars().count() > MIN_HEADLINE_LEN {
            let url = attribute(open_tag, "url")
                .or_else(|| attribute(open_tag, "data-url"))
                .unwrap_or_default();
            return Some(NewsItem::new(headline, source, url));
        }
    }

    TITLE_ELEMENT.captures_iter(card).find_map(|caps| {
        let headline = clean_headline(&inner_text(caps.get(2)?.as_str()));
        if headline.chars().count() <= MIN_HEADLINE_LEN {
            return None;
        }
        let url = attribute(caps.get(1)?.as_str(), "href").unwrap_or_default();
        Some(NewsItem::new(headline, source, url))
    })
}

fn parse_page(body: &str, source: &str, limit: usize) -> Vec<NewsItem> {
    let cards = news_cards(body);
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (index, (start, open_tag)) in cards.iter().enumerate() {
        if items.len() >= limit {
            break;
        }
        let end = cards
            .get(index + 1)
            .map_or(body.len(), |(next_start, _)| *next_start);
        let card = &body[*start + open_tag.len()..end];

        if let Some(item) = card_item(open_tag, card, source) {
            if seen.insert(normalize_key(&item.headline)) {
                items.push(item);
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use crate::TickerResolver;

    #[test]
    fn reads_data_attributes_then_anchors() {
        let body = r#"
            <div class="news-card newsitem cardcommon" data-title="Tata Motors unveils new EV lineup" url="https://example.test/ev">
              <a class="title" href="https://example.test/ev">Tata Motors unveils new EV lineup</a>
            </div>
            <div class="NewsCard">
              <a href="/img">Img</a>
              <h3>Tata Motors Q3 profit doubles on JLR demand</h3>
            </div>
            <div class="sidebar"><a href="https://example.test/ad">Sponsored advertisement headline</a></div>
        "#;

        let items = parse_page(body, "Bing News", 5);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].headline, "Tata Motors unveils new EV lineup");
        assert_eq!(items[0].url, "https://example.test/ev");
        assert_eq!(items[1].headline, "Tata Motors Q3 profit doubles on JLR demand");
        assert_eq!(items[1].url, "");
    }

    #[test]
    fn nested_cards_do_not_repeat_headlines() {
        let body = r#"
            <div class="news-wrapper"><div class="news-card">
              <a href="https://example.test/a">Wipro signs multi-year cloud contract</a>
            </div></div>
        "#;

        let items = parse_page(body, "Bing News", 5);

        assert_eq!(items.len(), 1);
    }

    #[test]
    fn respects_limit() {
        let card = r#"<div class="news-card"><a href="u">Headline number NUM about markets</a></div>"#;
        let body: String = (0..8).map(|n| card.replace("NUM", &n.to_string())).collect();

        assert_eq!(parse_page(&body, "Bing News", 3).len(), 3);
    }

    #[tokio::test]
    async fn search_query_combines_name_and_symbol() {
        let client = Arc::new(ScriptedHttpClient::new().respond_ok(SEARCH_URL, "<html></html>"));
        let source = BingNews::new(client.clone());
        let ticker = TickerResolver::default().resolve("INFY").expect("valid");

        source
            .fetch(&NewsQuery::new("Infosys", ticker), 5)
            .await
            .expect("page");

        assert_eq!(
            client.requests()[0].url,
            "https://www.bing.com/news/search?q=Infosys%20INFY%20news"
        );
    }
}
