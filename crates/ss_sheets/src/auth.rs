//! OAuth2 service-account flow: a signed JWT assertion is exchanged at the
//! key's token URI for a short-lived bearer token.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use ss_core::{Error, Result, ServiceAccountKey};
use tokio::sync::Mutex;
use tracing::debug;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(key: &ServiceAccountKey, scope: &str, now: i64) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: scope.to_string(),
            aud: key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct TokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            scope: SHEETS_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Signs the JWT assertion for `now` (unix seconds).
    pub fn assertion(&self, now: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.private_key_id.clone());

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| Error::configuration(format!("Invalid service account private key: {e}")))?;

        encode(&header, &Claims::new(&self.key, &self.scope, now), &signing_key)
            .map_err(|e| Error::configuration(format!("Failed to sign token assertion: {e}")))
    }

    /// Returns a valid bearer token, fetching a new one when needed.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        debug!(client_email = %self.key.client_email, "Requesting access token");
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::resource(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::resource(format!(
                "Token request rejected ({status}): {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::resource(format!("Invalid token response: {e}")))?;

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            key_type: "service_account".to_string(),
            project_id: "proj".to_string(),
            private_key_id: "kid".to_string(),
            private_key: private_key.to_string(),
            client_email: "bot@proj.iam.gserviceaccount.com".to_string(),
            client_id: "123".to_string(),
            auth_uri: ss_core::config::DEFAULT_AUTH_URI.to_string(),
            token_uri: ss_core::config::DEFAULT_TOKEN_URI.to_string(),
            auth_provider_x509_cert_url: None,
            client_x509_cert_url: None,
        }
    }

    #[test]
    fn test_claims() {
        let claims = Claims::new(&key("unused"), SHEETS_SCOPE, 1_700_000_000);
        assert_eq!(claims.iss, "bot@proj.iam.gserviceaccount.com");
        assert_eq!(claims.aud, ss_core::config::DEFAULT_TOKEN_URI);
        assert_eq!(claims.scope, SHEETS_SCOPE);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_invalid_private_key_is_a_configuration_error() {
        let provider = TokenProvider::new(reqwest::Client::new(), key("not a pem"));
        let err = provider.assertion(1_700_000_000).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
