//! Markup and headline text helpers shared by the scraped sources.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const NOISE_PREFIXES: [&str; 4] = ["Breaking:", "BREAKING:", "News:", "NEWS:"];

/// Drops tags and unwraps CDATA sections, leaving text content.
pub fn strip_tags(markup: &str) -> String {
    let unwrapped = CDATA.replace_all(markup, "$1");
    TAG.replace_all(&unwrapped, " ").into_owned()
}

/// Decodes the named and numeric entities that show up in headlines.
pub fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Text content of a markup fragment with whitespace collapsed.
pub fn inner_text(markup: &str) -> String {
    collapse_whitespace(&decode_entities(&strip_tags(markup)))
}

pub fn collapse_whitespace(text: &str) -> String {
    SPACE.replace_all(text.trim(), " ").into_owned()
}

/// Collapses whitespace and removes "Breaking:"-style prefixes.
pub fn clean_headline(raw: &str) -> String {
    let mut headline = collapse_whitespace(raw);
    for prefix in NOISE_PREFIXES {
        if let Some(rest) = headline.strip_prefix(prefix) {
            headline = rest.trim_start().to_owned();
        }
    }
    headline
}

/// Dedup key: lowercase alphanumerics, single spaces.
pub fn normalize_key(headline: &str) -> String {
    let folded: String = headline
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&folded)
}

/// Value of `name="..."` inside a single start tag.
pub fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let mut search = tag;
    while let Some(position) = search.find(&needle) {
        let preceded_by_space = position == 0
            || search[..position]
                .chars()
                .last()
                .is_some_and(char::is_whitespace);
        let rest = &search[position + needle.len()..];
        if preceded_by_space {
            return rest.find('"').map(|end| decode_entities(&rest[..end]));
        }
        search = rest;
    }
    None
}
