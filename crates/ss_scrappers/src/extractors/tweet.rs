//! Single-post fetches through the public oEmbed endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::Deserialize;
use ss_core::{Error, PostRecord, Result};
use tracing::{debug, error};
use url::Url;

use super::utils::element_text;
use super::PostExtractor;

#[derive(Debug, Deserialize)]
pub struct OEmbedResponse {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub author_url: String,
    #[serde(default)]
    pub html: String,
}

pub struct TweetExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl TweetExtractor {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn status_url(id: &str) -> String {
        format!("https://twitter.com/i/status/{id}")
    }
}

#[async_trait]
impl PostExtractor for TweetExtractor {
    fn extract_id(&self, url: &str) -> Option<String> {
        let parsed = match Url::parse(url.trim()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(%url, error = %e, "Error extracting tweet ID");
                return None;
            }
        };

        let id = parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
            .map(str::to_string);

        if id.is_none() {
            error!(%url, "Error extracting tweet ID: URL has no path");
        }
        id
    }

    async fn extract(&self, id: &str) -> Result<Option<PostRecord>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", Self::status_url(id).as_str()),
                ("omit_script", "true"),
                ("dnt", "true"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                debug!(%id, status = %response.status(), "Tweet not available");
                return Ok(None);
            }
            status if !status.is_success() => {
                return Err(Error::extraction(format!(
                    "oEmbed request for tweet {id} returned {status}"
                )));
            }
            _ => {}
        }

        let embed: OEmbedResponse = response.json().await?;
        Ok(parse_oembed(id, embed))
    }
}

/// Builds a post record from an oEmbed payload; `None` when the embed carries
/// no tweet text.
pub fn parse_oembed(id: &str, embed: OEmbedResponse) -> Option<PostRecord> {
    let fragment = Html::parse_fragment(&embed.html);

    let text = Selector::parse("blockquote p")
        .ok()
        .and_then(|selector| {
            fragment
                .select(&selector)
                .next()
                .map(|p| p.text().collect::<String>().trim().to_string())
        })
        .filter(|text| !text.is_empty())?;

    let date = Selector::parse("blockquote > a")
        .ok()
        .and_then(|selector| fragment.select(&selector).last().map(element_text))
        .unwrap_or_default();

    let username = embed
        .author_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
        .unwrap_or_default();

    let url = if embed.url.is_empty() {
        TweetExtractor::status_url(id)
    } else {
        embed.url
    };

    Some(PostRecord {
        text,
        username,
        date,
        url,
    })
}
