//! One sweep over the source worksheet.
//!
//! Rows are handled strictly in sheet order. A row is flagged as done only
//! after its destination row has been appended; extraction problems skip the
//! row and leave it pending for the next pass, while spreadsheet failures
//! abort the pass.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use ss_core::{
    ContentKind, Error, Result, Settings, SheetNames, SheetsClient, SourceRow, Spreadsheet,
    DEFAULT_STATUS_COLUMN, DONE_FLAG, NEWS_HEADERS, TWEET_HEADERS,
};
use tracing::info;

use crate::extractors::{ArticleExtractor, HtmlArticleExtractor, PostExtractor, TweetExtractor};
use crate::logging::Logger;

/// Columns the source worksheet must carry.
const REQUIRED_COLUMNS: [&str; 2] = ["url", "type"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Persisted { sheet: String },
    SkippedNoUrl,
    SkippedAlreadyDone,
    SkippedUnknownType { kind: String },
    SkippedEmptyResult,
    SkippedExtractError { error: String },
}

impl RowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RowOutcome::Persisted { .. } => "persisted",
            RowOutcome::SkippedNoUrl => "skipped_no_url",
            RowOutcome::SkippedAlreadyDone => "skipped_already_done",
            RowOutcome::SkippedUnknownType { .. } => "skipped_unknown_type",
            RowOutcome::SkippedEmptyResult => "skipped_empty_result",
            RowOutcome::SkippedExtractError { .. } => "skipped_extract_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub row: usize,
    pub url: Option<String>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub rows_read: usize,
    /// Number of rows per outcome label.
    pub counts: BTreeMap<&'static str, usize>,
    pub rows: Vec<RowReport>,
}

impl PassReport {
    pub fn new(rows_read: usize) -> Self {
        Self {
            rows_read,
            counts: BTreeMap::new(),
            rows: Vec::with_capacity(rows_read),
        }
    }

    pub fn push(&mut self, row: RowReport) {
        *self.counts.entry(row.outcome.label()).or_insert(0) += 1;
        self.rows.push(row);
    }

    pub fn persisted(&self) -> usize {
        self.counts.get("persisted").copied().unwrap_or(0)
    }
}

pub struct RowProcessor {
    articles: Arc<dyn ArticleExtractor>,
    posts: Arc<dyn PostExtractor>,
    sheets: SheetNames,
}

impl RowProcessor {
    pub fn new(
        articles: Arc<dyn ArticleExtractor>,
        posts: Arc<dyn PostExtractor>,
        sheets: SheetNames,
    ) -> Self {
        Self {
            articles,
            posts,
            sheets,
        }
    }

    /// Processor backed by the HTML article extractor and the oEmbed tweet
    /// extractor, sharing one HTTP client.
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Self {
        Self::new(
            Arc::new(HtmlArticleExtractor::new(client.clone(), &settings.scrape.language)),
            Arc::new(TweetExtractor::new(client, &settings.scrape.oembed_endpoint)),
            settings.sheets.clone(),
        )
    }

    pub fn articles(&self) -> &dyn ArticleExtractor {
        self.articles.as_ref()
    }

    pub fn posts(&self) -> &dyn PostExtractor {
        self.posts.as_ref()
    }

    pub fn sheets(&self) -> &SheetNames {
        &self.sheets
    }

    pub async fn run(&self, book: &dyn Spreadsheet) -> Result<PassReport> {
        let records = book.get_rows(&self.sheets.source).await?;
        info!(
            rows = records.len(),
            sheet = %self.sheets.source,
            "Retrieved rows from the worksheet"
        );

        let mut report = PassReport::new(records.len());
        let Some(first) = records.first() else {
            return Ok(report);
        };

        for column in REQUIRED_COLUMNS {
            if first.column_of(column).is_none() {
                return Err(Error::Schema(format!(
                    "Worksheet '{}' has no '{}' column",
                    self.sheets.source, column
                )));
            }
        }
        let status_column = first.column_of("scrapped").unwrap_or(DEFAULT_STATUS_COLUMN);

        let mut pass = Pass {
            book,
            status_column,
            headers_ready: HashSet::new(),
        };
        for record in &records {
            let row = SourceRow::from_record(record, status_column);
            let outcome = self.process_row(&mut pass, &row).await?;
            report.push(RowReport {
                row: row.row_number,
                url: row.url,
                outcome,
            });
        }

        info!(
            rows = report.rows_read,
            persisted = report.persisted(),
            counts = ?report.counts,
            "Scrape pass finished"
        );
        Ok(report)
    }

    async fn process_row(&self, pass: &mut Pass<'_>, row: &SourceRow) -> Result<RowOutcome> {
        let Some(url) = row.url.as_deref() else {
            return Ok(RowOutcome::SkippedNoUrl);
        };
        let log = Logger::new()
            .with_prefix(format!("[{}]", self.sheets.source))
            .with_prefix(format!("[row {}]", row.row_number));
        if row.is_done() {
            log.debug(&format!("Already scrapped: {url}"));
            return Ok(RowOutcome::SkippedAlreadyDone);
        }

        match &row.kind {
            ContentKind::NewsArticle => self.process_article(pass, row, url, &log).await,
            ContentKind::Tweet => self.process_tweet(pass, row, url, &log).await,
            ContentKind::Unknown(kind) => {
                log.warn(&format!("Unknown content type '{kind}' for URL: {url}"));
                Ok(RowOutcome::SkippedUnknownType { kind: kind.clone() })
            }
        }
    }

    async fn process_article(
        &self,
        pass: &mut Pass<'_>,
        row: &SourceRow,
        url: &str,
        log: &Logger,
    ) -> Result<RowOutcome> {
        log.info(&format!("Scraping news from URL: {url}"));
        let article = match self.articles.extract(url).await {
            Ok(Some(article)) => article,
            Ok(None) => {
                log.warn(&format!("No article data found for URL: {url}"));
                return Ok(RowOutcome::SkippedEmptyResult);
            }
            Err(e) => {
                log.error(&format!("Failed to extract article from {url}: {e}"));
                return Ok(RowOutcome::SkippedExtractError { error: e.to_string() });
            }
        };

        let values = article.destination_row(url, &row.category);
        let outcome = pass.persist(&self.sheets, &self.sheets.news, &NEWS_HEADERS, &values, row).await?;
        log.info(&format!("Successfully scraped and saved article from URL: {url}"));
        Ok(outcome)
    }

    async fn process_tweet(
        &self,
        pass: &mut Pass<'_>,
        row: &SourceRow,
        url: &str,
        log: &Logger,
    ) -> Result<RowOutcome> {
        let Some(id) = self.posts.extract_id(url) else {
            log.warn(&format!("Could not derive a tweet ID from URL: {url}"));
            return Ok(RowOutcome::SkippedExtractError {
                error: format!("no tweet ID in {url}"),
            });
        };

        log.info(&format!("Scraping tweet {id} from URL: {url}"));
        let post = match self.posts.extract(&id).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                log.warn(&format!("No tweet data found for ID: {id}"));
                return Ok(RowOutcome::SkippedEmptyResult);
            }
            Err(e) => {
                log.error(&format!("Error scraping tweet ID {id}: {e}"));
                return Ok(RowOutcome::SkippedExtractError { error: e.to_string() });
            }
        };

        let values = post.destination_row(&row.category);
        let outcome = pass.persist(&self.sheets, &self.sheets.tweets, &TWEET_HEADERS, &values, row).await?;
        log.info(&format!("Successfully scraped and saved tweet from URL: {url}"));
        Ok(outcome)
    }
}

/// Spreadsheet reference to open, once the configuration the backend needs
/// has been validated.
pub fn workbook_reference(settings: &Settings, client: &dyn SheetsClient) -> Result<String> {
    if client.requires_credentials() {
        return Ok(settings.validate()?.spreadsheet_url);
    }
    settings
        .spreadsheet_url
        .clone()
        .ok_or_else(|| Error::configuration("SPREADSHEET_URL environment variable is required"))
}

pub async fn open_workbook(
    settings: &Settings,
    client: &dyn SheetsClient,
) -> Result<Box<dyn Spreadsheet>> {
    let reference = workbook_reference(settings, client)?;
    client.open(&reference).await
}

/// Per-pass write state.
struct Pass<'a> {
    book: &'a dyn Spreadsheet,
    status_column: usize,
    /// Destination sheets whose header row was checked during this pass.
    headers_ready: HashSet<String>,
}

impl Pass<'_> {
    async fn persist(
        &mut self,
        sheets: &SheetNames,
        destination: &str,
        headers: &[&str],
        values: &[String],
        row: &SourceRow,
    ) -> Result<RowOutcome> {
        if !self.headers_ready.contains(destination) {
            self.book.ensure_headers(destination, headers).await?;
            self.headers_ready.insert(destination.to_string());
        }

        self.book.append_row(destination, values).await?;
        self.book
            .update_cell(&sheets.source, row.row_number, self.status_column, DONE_FLAG)
            .await?;

        Ok(RowOutcome::Persisted {
            sheet: destination.to_string(),
        })
    }
}
