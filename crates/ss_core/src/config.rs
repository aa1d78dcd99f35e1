//! Environment-sourced settings.
//!
//! [`Settings`] is loaded once at startup and never fails; credential problems
//! surface when [`Settings::validate`] turns it into a [`SheetsConfig`]. This
//! lets the web server come up and report a broken configuration on its
//! health endpoint instead of refusing to start.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_OEMBED_ENDPOINT: &str = "https://publish.twitter.com/oembed";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Google service-account key, in the layout of the JSON key file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub auth_provider_x509_cert_url: Option<String>,
    #[serde(default)]
    pub client_x509_cert_url: Option<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    fn check(self) -> Result<Self> {
        if self.key_type != "service_account" {
            return Err(Error::configuration(format!(
                "Unsupported credential type '{}', expected 'service_account'",
                self.key_type
            )));
        }
        if !self.private_key.contains("PRIVATE KEY") {
            return Err(Error::configuration(
                "Service account private key is not a PEM encoded key",
            ));
        }
        if self.client_email.is_empty() {
            return Err(Error::configuration("Service account client email is empty"));
        }
        Ok(self)
    }
}

/// Service-account fields as they arrive from individual environment variables.
#[derive(Debug, Clone, Default)]
pub struct InlineCredentials {
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: Option<String>,
    pub client_email: Option<String>,
    pub client_id: Option<String>,
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
    pub auth_provider_x509_cert_url: Option<String>,
    pub client_x509_cert_url: Option<String>,
}

impl InlineCredentials {
    fn is_empty(&self) -> bool {
        self.key_type.is_none()
            && self.project_id.is_none()
            && self.private_key_id.is_none()
            && self.private_key.is_none()
            && self.client_email.is_none()
            && self.client_id.is_none()
    }

    fn into_key(self) -> Result<ServiceAccountKey> {
        fn required(value: Option<String>, var: &str) -> Result<String> {
            value.ok_or_else(|| Error::configuration(format!("{var} environment variable is required")))
        }

        Ok(ServiceAccountKey {
            key_type: required(self.key_type, "SERVICE_ACCOUNT_TYPE")?,
            project_id: required(self.project_id, "SERVICE_ACCOUNT_PROJECT_ID")?,
            private_key_id: required(self.private_key_id, "SERVICE_ACCOUNT_PRIVATE_KEY_ID")?,
            private_key: unescape_newlines(&required(self.private_key, "SERVICE_ACCOUNT_PRIVATE_KEY")?),
            client_email: required(self.client_email, "SERVICE_ACCOUNT_CLIENT_EMAIL")?,
            client_id: required(self.client_id, "SERVICE_ACCOUNT_CLIENT_ID")?,
            auth_uri: self.auth_uri.unwrap_or_else(default_auth_uri),
            token_uri: self.token_uri.unwrap_or_else(default_token_uri),
            auth_provider_x509_cert_url: self.auth_provider_x509_cert_url,
            client_x509_cert_url: self.client_x509_cert_url,
        })
    }
}

/// Keys stored in env files usually carry literal `\n` sequences.
pub fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub source: String,
    pub news: String,
    pub tweets: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            source: "Raw".to_string(),
            news: "Scrapped news".to_string(),
            tweets: "Scrapped tweets".to_string(),
        }
    }
}

/// Settings for the outbound HTTP client and the extractors.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub language: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub oembed_endpoint: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            oembed_endpoint: DEFAULT_OEMBED_ENDPOINT.to_string(),
        }
    }
}

/// Validated spreadsheet access configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub credentials: ServiceAccountKey,
    pub spreadsheet_url: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub service_account_path: Option<PathBuf>,
    pub inline_credentials: InlineCredentials,
    pub spreadsheet_url: Option<String>,
    pub sheets: SheetNames,
    pub scrape: ScrapeSettings,
    pub bind_addr: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_account_path: None,
            inline_credentials: InlineCredentials::default(),
            spreadsheet_url: None,
            sheets: SheetNames::default(),
            scrape: ScrapeSettings::default(),
            bind_addr: "0.0.0.0:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let inline_credentials = InlineCredentials {
            key_type: get("SERVICE_ACCOUNT_TYPE"),
            project_id: get("SERVICE_ACCOUNT_PROJECT_ID"),
            private_key_id: get("SERVICE_ACCOUNT_PRIVATE_KEY_ID"),
            private_key: get("SERVICE_ACCOUNT_PRIVATE_KEY"),
            client_email: get("SERVICE_ACCOUNT_CLIENT_EMAIL"),
            client_id: get("SERVICE_ACCOUNT_CLIENT_ID"),
            auth_uri: get("SERVICE_ACCOUNT_AUTH_URI"),
            token_uri: get("SERVICE_ACCOUNT_TOKEN_URI"),
            auth_provider_x509_cert_url: get("SERVICE_ACCOUNT_AUTH_PROVIDER_CERT_URL"),
            client_x509_cert_url: get("SERVICE_ACCOUNT_CLIENT_CERT_URL"),
        };

        let timeout = match get("HTTP_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => Duration::from_secs(secs),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring invalid HTTP_TIMEOUT_SECS");
                defaults.scrape.timeout
            }
            None => defaults.scrape.timeout,
        };

        Self {
            service_account_path: get("SERVICE_ACCOUNT_PATH").map(PathBuf::from),
            inline_credentials,
            spreadsheet_url: get("SPREADSHEET_URL"),
            sheets: SheetNames {
                source: get("SOURCE_SHEET").unwrap_or(defaults.sheets.source),
                news: get("NEWS_SHEET").unwrap_or(defaults.sheets.news),
                tweets: get("TWEETS_SHEET").unwrap_or(defaults.sheets.tweets),
            },
            scrape: ScrapeSettings {
                language: get("ARTICLE_LANGUAGE").unwrap_or(defaults.scrape.language),
                user_agent: get("USER_AGENT").unwrap_or(defaults.scrape.user_agent),
                timeout,
                oembed_endpoint: get("OEMBED_ENDPOINT").unwrap_or(defaults.scrape.oembed_endpoint),
            },
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Resolves the service-account key. A key file takes precedence over
    /// inline variables.
    pub fn credentials(&self) -> Result<ServiceAccountKey> {
        let key = if let Some(path) = &self.service_account_path {
            if !path.exists() {
                return Err(Error::configuration(format!(
                    "Service account file not found: {}",
                    path.display()
                )));
            }
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<ServiceAccountKey>(&raw).map_err(|e| {
                Error::configuration(format!("Invalid service account file {}: {e}", path.display()))
            })?
        } else if self.inline_credentials.is_empty() {
            return Err(Error::configuration(
                "Service account credentials are not set (SERVICE_ACCOUNT_PATH or SERVICE_ACCOUNT_* variables)",
            ));
        } else {
            self.inline_credentials.clone().into_key()?
        };
        key.check()
    }

    pub fn validate(&self) -> Result<SheetsConfig> {
        let credentials = self.credentials()?;
        let spreadsheet_url = self
            .spreadsheet_url
            .clone()
            .ok_or_else(|| Error::configuration("SPREADSHEET_URL environment variable is required"))?;
        Ok(SheetsConfig {
            credentials,
            spreadsheet_url,
        })
    }
}
