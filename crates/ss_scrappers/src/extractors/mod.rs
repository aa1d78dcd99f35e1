use async_trait::async_trait;
use ss_core::{ArticleRecord, PostRecord, Result};

pub mod article;
pub mod jsonld;
pub mod tweet;

pub use article::HtmlArticleExtractor;
pub use tweet::TweetExtractor;

/// Turns a news page into an [`ArticleRecord`].
///
/// `Ok(None)` means the page yielded nothing usable (fetch failed or the body
/// was too short); `Err` is reserved for invalid input and faults the caller
/// should report.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Option<ArticleRecord>>;
}

/// Fetches single social posts.
#[async_trait]
pub trait PostExtractor: Send + Sync {
    /// Derives the post identifier from its URL
    fn extract_id(&self, url: &str) -> Option<String>;

    /// Fetches the post; `Ok(None)` when the provider has no such post
    async fn extract(&self, id: &str) -> Result<Option<PostRecord>>;
}

/// Common utilities for extractors
pub(crate) mod utils {
    use scraper::{ElementRef, Html, Selector};

    /// Whitespace-collapsed text of an element.
    pub fn element_text(element: ElementRef<'_>) -> String {
        let text = element.text().collect::<Vec<_>>().join(" ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Text of the first element matching `selector`, if non-empty.
    pub fn extract_text(document: &Html, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    /// `content` of the first `<meta>` whose `name` or `property` is `key`.
    pub fn meta_content(document: &Html, key: &str) -> Option<String> {
        let selector = Selector::parse("meta[content]").ok()?;
        document
            .select(&selector)
            .find(|el| {
                let value = el.value();
                value
                    .attr("name")
                    .or_else(|| value.attr("property"))
                    .or_else(|| value.attr("itemprop"))
                    .is_some_and(|name| name.eq_ignore_ascii_case(key))
            })
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }

}
