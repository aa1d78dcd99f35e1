//! HTTP client utilities.

use reqwest::header::ACCEPT_LANGUAGE;
use ss_core::{Error, Result, ScrapeSettings};

/// Create the shared asynchronous HTTP client.
pub fn create_client(settings: &ScrapeSettings) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(settings.timeout)
        .build()?;
    Ok(client)
}

/// Fetch a page body, failing on non-success statuses.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    language: Option<&str>,
) -> Result<String> {
    let mut request = client.get(url);
    if let Some(language) = language {
        request = request.header(ACCEPT_LANGUAGE, language);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::extraction(format!("{url} returned {status}")));
    }
    Ok(response.text().await?)
}
