use std::sync::Arc;

use ss_core::{Error, Result, Settings, SheetsClient};

#[cfg(feature = "google")]
pub mod auth;
pub mod backends;

pub use backends::*;

/// Builds the spreadsheet client named by `backend`.
///
/// The Google client is created even when credentials are invalid; the
/// problem surfaces as a configuration error when a spreadsheet is opened.
pub fn create_client(
    backend: &str,
    settings: &Settings,
    http: reqwest::Client,
) -> Result<Arc<dyn SheetsClient>> {
    match backend {
        "memory" => Ok(Arc::new(MemorySheetsClient::default())),
        #[cfg(feature = "google")]
        "google" => {
            let credentials = match settings.credentials() {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Google Sheets credentials unavailable");
                    None
                }
            };
            Ok(Arc::new(GoogleSheetsClient::new(http, credentials)))
        }
        other => Err(Error::configuration(format!("Unknown sheets backend: {other}"))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_client;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let settings = Settings::default();
        let client = create_client("memory", &settings, reqwest::Client::new()).unwrap();
        assert_eq!(client.name(), "memory");
        assert!(create_client("qdrant", &settings, reqwest::Client::new()).is_err());
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn test_google_client_without_credentials_fails_on_open() {
        let settings = Settings::default();
        let client = create_client("google", &settings, reqwest::Client::new()).unwrap();
        assert_eq!(client.name(), "google");
        let err = client.open("abc").await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
