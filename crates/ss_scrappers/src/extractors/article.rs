//! Generic news article extraction.
//!
//! Works on any page rather than a fixed set of outlets: the title comes from
//! OpenGraph or `<title>`, the body from the paragraphs of the most specific
//! content container, authors and dates from JSON-LD and meta tags.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::{Html, Selector};
use ss_core::{ArticleRecord, Error, Result};
use tracing::{debug, error, warn};

use super::jsonld;
use super::utils::{element_text, extract_text, meta_content};
use super::ArticleExtractor;
use crate::http::fetch_text;

/// Bodies shorter than this (in characters) are treated as extraction misses.
pub const MIN_TEXT_CHARS: usize = 100;

/// Content containers, most specific first.
const BODY_CONTAINERS: [&str; 4] = ["[itemprop='articleBody']", "article", "main", "body"];

const DATE_META_KEYS: [&str; 5] = [
    "article:published_time",
    "datePublished",
    "pubdate",
    "publishdate",
    "date",
];

pub struct HtmlArticleExtractor {
    client: reqwest::Client,
    language: String,
}

impl HtmlArticleExtractor {
    pub fn new(client: reqwest::Client, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
        }
    }
}

#[async_trait]
impl ArticleExtractor for HtmlArticleExtractor {
    async fn extract(&self, url: &str) -> Result<Option<ArticleRecord>> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("URL cannot be empty.".to_string()));
        }

        let html = match fetch_text(&self.client, url, Some(self.language.as_str())).await {
            Ok(html) => html,
            Err(e) => {
                error!(%url, error = %e, "Failed to process article");
                return Ok(None);
            }
        };

        let record = parse_article(&html);
        let chars = record.text.chars().count();
        if chars < MIN_TEXT_CHARS {
            warn!(%url, chars, "Article appears empty or too short");
            return Ok(None);
        }

        debug!(%url, chars, authors = record.authors.len(), "Parsed article");
        Ok(Some(record))
    }
}

/// Parses a page into an article record without applying the length gate.
pub fn parse_article(html: &str) -> ArticleRecord {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "og:title")
        .or_else(|| extract_text(&document, "title"))
        .or_else(|| extract_text(&document, "h1"))
        .unwrap_or_default();

    let publish_date = DATE_META_KEYS
        .iter()
        .find_map(|key| meta_content(&document, key))
        .or_else(|| jsonld::extract_date_published(&document))
        .and_then(|raw| normalize_date(&raw));

    ArticleRecord {
        title,
        text: extract_body(&document),
        authors: extract_authors(&document),
        publish_date,
        metadata: extract_metadata(&document),
    }
}

fn paragraphs_of(element: scraper::ElementRef<'_>, paragraph: &Selector) -> Vec<String> {
    element
        .select(paragraph)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Joined paragraphs of the first container holding a full-length body,
/// falling back to whichever container holds the most text.
fn extract_body(document: &Html) -> String {
    let Ok(paragraph) = Selector::parse("p") else {
        return String::new();
    };

    let mut best = String::new();
    for container in BODY_CONTAINERS {
        let Ok(selector) = Selector::parse(container) else {
            continue;
        };
        let candidate = document
            .select(&selector)
            .map(|el| paragraphs_of(el, &paragraph).join("\n\n"))
            .max_by_key(|text| text.chars().count())
            .unwrap_or_default();

        if candidate.chars().count() >= MIN_TEXT_CHARS {
            return candidate;
        }
        if candidate.chars().count() > best.chars().count() {
            best = candidate;
        }
    }
    best
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = jsonld::extract_authors(document);

    if authors.is_empty() {
        if let Some(author) = meta_content(document, "author") {
            authors.push(author);
        }
    }
    if authors.is_empty() {
        if let Ok(selector) = Selector::parse("[rel='author']") {
            authors.extend(document.select(&selector).map(element_text));
        }
    }

    let mut unique = Vec::with_capacity(authors.len());
    for author in authors {
        if !author.is_empty() && !unique.contains(&author) {
            unique.push(author);
        }
    }
    unique
}

fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[content]") else {
        return metadata;
    };

    for meta in document.select(&selector) {
        let value = meta.value();
        let key = value
            .attr("name")
            .or_else(|| value.attr("property"))
            .or_else(|| value.attr("itemprop"));
        if let (Some(key), Some(content)) = (key, value.attr("content")) {
            metadata
                .entry(key.trim().to_string())
                .or_insert_with(|| content.trim().to_string());
        }
    }
    metadata
}

/// Normalizes a publication date to `YYYY-MM-DD HH:MM:SS±HH:MM`, or
/// `YYYY-MM-DD` when the source only carries a date.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%Y-%m-%d %H:%M:%S%:z").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|day| day.format("%Y-%m-%d").to_string())
}
