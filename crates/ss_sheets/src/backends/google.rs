//! Google Sheets REST v4 backend.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use ss_core::types::records_from_values;
use ss_core::{Error, Result, ServiceAccountKey, SheetRecord, SheetsClient, Spreadsheet};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::auth::TokenProvider;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
/// Shape given to worksheets created on first use.
const NEW_SHEET_ROWS: u32 = 100;
const NEW_SHEET_COLS: u32 = 20;

/// Extracts the spreadsheet id from a `docs.google.com/spreadsheets/d/<id>/...`
/// URL, or accepts a bare id.
pub fn spreadsheet_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if let Ok(url) = Url::parse(reference) {
        let mut segments = url.path_segments()?;
        segments.find(|segment| *segment == "d")?;
        return segments
            .next()
            .filter(|id| is_id(id))
            .map(str::to_string);
    }
    is_id(reference).then(|| reference.to_string())
}

fn is_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 1 → `A`, 26 → `Z`, 27 → `AA`.
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quotes a worksheet title for use in A1 notation.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn cell_range(title: &str, row: usize, col: usize) -> String {
    format!("{}!{}{}", quote_sheet(title), column_letters(col), row)
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl ValueRange {
    fn into_strings(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Clone)]
struct Api {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    base: String,
}

impl Api {
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base)?;
        url.path_segments_mut()
            .map_err(|_| Error::resource(format!("Invalid Sheets API base: {}", self.base)))?
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.auth.token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::resource(format!("Sheets request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::resource(format!("Sheets API returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::resource(format!("Invalid Sheets API response: {e}")))
    }
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    auth: Option<Arc<TokenProvider>>,
    base: String,
}

impl GoogleSheetsClient {
    /// A client without credentials can be built; opening fails with a
    /// configuration error.
    pub fn new(http: reqwest::Client, credentials: Option<ServiceAccountKey>) -> Self {
        let auth = credentials.map(|key| Arc::new(TokenProvider::new(http.clone(), key)));
        Self {
            http,
            auth,
            base: SHEETS_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SheetsClient for GoogleSheetsClient {
    fn name(&self) -> &str {
        "google"
    }

    async fn open(&self, reference: &str) -> Result<Box<dyn Spreadsheet>> {
        let auth = self
            .auth
            .clone()
            .ok_or_else(|| Error::configuration("Service account credentials are not set"))?;

        let id = spreadsheet_id(reference).ok_or_else(|| {
            Error::resource(format!("Failed to open spreadsheet '{reference}': no spreadsheet id"))
        })?;

        let api = Api {
            http: self.http.clone(),
            auth,
            base: self.base.clone(),
        };

        let mut url = api.url(&[id.as_str()])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let meta = api
            .send(api.request(Method::GET, url).await?)
            .await
            .and_then(|value| serde_json::from_value::<SpreadsheetMeta>(value).map_err(Error::from))
            .map_err(|e| match e {
                Error::Configuration(_) => e,
                other => Error::resource(format!("Failed to open spreadsheet '{reference}': {other}")),
            })?;

        let titles = meta.sheets.into_iter().map(|s| s.properties.title).collect::<HashSet<_>>();
        debug!(spreadsheet = %id, sheets = titles.len(), "Opened spreadsheet");

        Ok(Box::new(GoogleSpreadsheet {
            api,
            id,
            titles: Mutex::new(titles),
        }))
    }
}

pub struct GoogleSpreadsheet {
    api: Api,
    id: String,
    titles: Mutex<HashSet<String>>,
}

impl GoogleSpreadsheet {
    async fn resolve_sheet(&self, title: &str) -> Result<()> {
        let mut titles = self.titles.lock().await;
        if titles.contains(title) {
            return Ok(());
        }

        info!("Worksheet '{}' not found. Creating a new worksheet.", title);
        let target = format!("{}:batchUpdate", self.id);
        let url = self.api.url(&[target.as_str()])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        }
                    }
                }
            }]
        });
        self.api
            .send(self.api.request(Method::POST, url).await?.json(&body))
            .await?;
        titles.insert(title.to_string());
        Ok(())
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let mut url = self.api.url(&[self.id.as_str(), "values", range])?;
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        let value = self.api.send(self.api.request(Method::GET, url).await?).await?;
        Ok(serde_json::from_value::<ValueRange>(value)?.into_strings())
    }
}

#[async_trait]
impl Spreadsheet for GoogleSpreadsheet {
    async fn headers(&self, sheet: &str) -> Result<Vec<String>> {
        self.resolve_sheet(sheet).await?;
        let range = format!("{}!1:1", quote_sheet(sheet));
        Ok(self.read_range(&range).await?.into_iter().next().unwrap_or_default())
    }

    async fn get_rows(&self, sheet: &str) -> Result<Vec<SheetRecord>> {
        self.resolve_sheet(sheet).await?;
        let values = self.read_range(&quote_sheet(sheet)).await?;
        Ok(records_from_values(values))
    }

    async fn append_row(&self, sheet: &str, values: &[String]) -> Result<()> {
        self.resolve_sheet(sheet).await?;
        let range = format!("{}!A1", quote_sheet(sheet));
        let target = format!("{range}:append");
        let mut url = self.api.url(&[self.id.as_str(), "values", target.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        self.api
            .send(self.api.request(Method::POST, url).await?.json(&body))
            .await?;
        Ok(())
    }

    async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(Error::InvalidInput(format!(
                "Cell coordinates are 1-based, got ({row}, {col})"
            )));
        }
        self.resolve_sheet(sheet).await?;
        let range = cell_range(sheet, row, col);
        let mut url = self.api.url(&[self.id.as_str(), "values", range.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = json!({ "range": range, "majorDimension": "ROWS", "values": [[value]] });
        self.api
            .send(self.api.request(Method::PUT, url).await?.json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        query: String,
        bearer: Option<String>,
        body: String,
    }

    type Requests = Arc<std::sync::Mutex<Vec<Recorded>>>;

    /// Stands in for both the token endpoint and the Sheets API.
    async fn fake_google(
        State(requests): State<Requests>,
        method: axum::http::Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> Response {
        let path = uri.path().to_string();
        requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: path.clone(),
            query: uri.query().unwrap_or_default().to_string(),
            bearer: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });

        let reply = match (method.as_str(), path.as_str()) {
            ("POST", "/token") => json!({ "access_token": "tok-1", "expires_in": 3600 }),
            ("GET", "/v4/spreadsheets/sheet123") => {
                json!({ "sheets": [{ "properties": { "title": "Raw" } }] })
            }
            ("GET", "/v4/spreadsheets/sheet123/values/'Raw'") => json!({
                "range": "'Raw'!A1:Z1000",
                "values": [["url", "type", "scrapped", "category"], ["http://a", "tweet"]]
            }),
            (_, p) if p.starts_with("/v4/spreadsheets/sheet123") => json!({}),
            _ => return (StatusCode::FORBIDDEN, "denied").into_response(),
        };
        Json(reply).into_response()
    }

    async fn serve_fake_google() -> (String, Requests) {
        let requests = Requests::default();
        let app = Router::new().fallback(fake_google).with_state(requests.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), requests)
    }

    fn signing_key(token_uri: String) -> ServiceAccountKey {
        ServiceAccountKey {
            key_type: "service_account".to_string(),
            project_id: "proj".to_string(),
            private_key_id: "kid".to_string(),
            private_key: include_str!("../../testdata/service_account_key.pem").to_string(),
            client_email: "bot@proj.iam.gserviceaccount.com".to_string(),
            client_id: "123".to_string(),
            auth_uri: String::new(),
            token_uri,
            auth_provider_x509_cert_url: None,
            client_x509_cert_url: None,
        }
    }

    fn client_for(base: &str, token_path: &str) -> GoogleSheetsClient {
        let key = signing_key(format!("{base}{token_path}"));
        GoogleSheetsClient::new(reqwest::Client::new(), Some(key))
            .with_api_base(format!("{base}/v4/spreadsheets"))
    }

    fn body_json(request: &Recorded) -> Value {
        serde_json::from_str(&request.body).unwrap()
    }

    #[tokio::test]
    async fn test_spreadsheet_requests() {
        let (base, requests) = serve_fake_google().await;
        let client = client_for(&base, "/token");

        let book = client
            .open("https://docs.google.com/spreadsheets/d/sheet123/edit#gid=0")
            .await
            .unwrap();
        let rows = book.get_rows("Raw").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("url"), Some("http://a"));
        assert_eq!(rows[0].get("scrapped"), Some(""));

        book.ensure_headers("Scrapped news", &["title", "text"]).await.unwrap();
        book.append_row("Scrapped news", &["T".to_string(), "body".to_string()])
            .await
            .unwrap();
        book.update_cell("Raw", 2, 3, "yes").await.unwrap();

        let requests = requests.lock().unwrap().clone();
        let (token, api): (Vec<_>, Vec<_>) = requests.iter().partition(|r| r.path == "/token");
        assert_eq!(token.len(), 1);
        assert!(token[0]
            .body
            .starts_with("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer&assertion="));
        assert!(api.iter().all(|r| r.bearer.as_deref() == Some("Bearer tok-1")));

        let calls: Vec<(&str, &str, &str)> = api
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.query.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("GET", "/v4/spreadsheets/sheet123", "fields=sheets.properties.title"),
                ("GET", "/v4/spreadsheets/sheet123/values/'Raw'", "majorDimension=ROWS"),
                ("POST", "/v4/spreadsheets/sheet123:batchUpdate", ""),
                (
                    "GET",
                    "/v4/spreadsheets/sheet123/values/'Scrapped%20news'!1:1",
                    "majorDimension=ROWS"
                ),
                (
                    "POST",
                    "/v4/spreadsheets/sheet123/values/'Scrapped%20news'!A1:append",
                    "valueInputOption=RAW&insertDataOption=INSERT_ROWS"
                ),
                (
                    "POST",
                    "/v4/spreadsheets/sheet123/values/'Scrapped%20news'!A1:append",
                    "valueInputOption=RAW&insertDataOption=INSERT_ROWS"
                ),
                ("PUT", "/v4/spreadsheets/sheet123/values/'Raw'!C2", "valueInputOption=RAW"),
            ]
        );

        let add_sheet = body_json(api[2]);
        assert_eq!(
            add_sheet["requests"][0]["addSheet"]["properties"],
            json!({
                "title": "Scrapped news",
                "gridProperties": { "rowCount": 100, "columnCount": 20 }
            })
        );
        assert_eq!(body_json(api[4])["values"], json!([["title", "text"]]));
        assert_eq!(body_json(api[5])["values"], json!([["T", "body"]]));
        assert_eq!(
            body_json(api[6]),
            json!({ "range": "'Raw'!C2", "majorDimension": "ROWS", "values": [["yes"]] })
        );
    }

    #[tokio::test]
    async fn test_rejected_requests_are_resource_errors() {
        let (base, requests) = serve_fake_google().await;

        let err = client_for(&base, "/token").open("other").await.err().unwrap();
        assert!(matches!(err, Error::Resource(_)));

        let err = client_for(&base, "/revoked-token").open("sheet123").await.err().unwrap();
        assert!(matches!(err, Error::Resource(ref msg) if msg.contains("403")));
        assert!(!requests
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.path == "/v4/spreadsheets/sheet123"));
    }

    #[test]
    fn test_spreadsheet_id_from_url() {
        assert_eq!(
            spreadsheet_id("https://docs.google.com/spreadsheets/d/1qH9feKF-_x/edit#gid=0").as_deref(),
            Some("1qH9feKF-_x")
        );
        assert_eq!(
            spreadsheet_id("https://docs.google.com/spreadsheets/d/abc123/").as_deref(),
            Some("abc123")
        );
        assert_eq!(spreadsheet_id("https://docs.google.com/spreadsheets/"), None);
    }

    #[test]
    fn test_spreadsheet_id_bare() {
        assert_eq!(spreadsheet_id(" abc_123 ").as_deref(), Some("abc_123"));
        assert_eq!(spreadsheet_id("not an id"), None);
        assert_eq!(spreadsheet_id(""), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(3), "C");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_cell_range_quotes_title() {
        assert_eq!(cell_range("Raw", 5, 3), "'Raw'!C5");
        assert_eq!(cell_range("Bob's sheet", 2, 1), "'Bob''s sheet'!A2");
    }

    #[test]
    fn test_value_range_into_strings() {
        let range: ValueRange = serde_json::from_value(json!({
            "range": "'Raw'!A1:D3",
            "values": [["url", "type"], ["http://a", 3, null, true]]
        }))
        .unwrap();
        assert_eq!(
            range.into_strings(),
            vec![
                vec!["url".to_string(), "type".to_string()],
                vec!["http://a".to_string(), "3".to_string(), "".to_string(), "true".to_string()],
            ]
        );

        let empty: ValueRange = serde_json::from_value(json!({ "range": "'Raw'!A1:Z1000" })).unwrap();
        assert!(empty.into_strings().is_empty());
    }

    #[tokio::test]
    async fn test_open_without_credentials() {
        let client = GoogleSheetsClient::new(reqwest::Client::new(), None);
        let err = client.open("abc").await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_api_url_encodes_ranges() {
        let client = GoogleSheetsClient::new(reqwest::Client::new(), None);
        let key = ServiceAccountKey {
            key_type: "service_account".to_string(),
            project_id: "p".to_string(),
            private_key_id: "k".to_string(),
            private_key: "pem".to_string(),
            client_email: "e".to_string(),
            client_id: "c".to_string(),
            auth_uri: String::new(),
            token_uri: String::new(),
            auth_provider_x509_cert_url: None,
            client_x509_cert_url: None,
        };
        let api = Api {
            http: client.http.clone(),
            auth: Arc::new(TokenProvider::new(client.http.clone(), key)),
            base: client.base.clone(),
        };
        let url = api.url(&["abc", "values", "'Scrapped news'!A1:append"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'Scrapped%20news'!A1:append"
        );
    }
}
