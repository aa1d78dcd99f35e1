use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// Value of the status flag once a source row has been handled.
pub const DONE_FLAG: &str = "yes";

/// Status column used when the source sheet has no `scrapped` header.
pub const DEFAULT_STATUS_COLUMN: usize = 3;

pub const NEWS_HEADERS: [&str; 7] = [
    "title",
    "text",
    "authors",
    "publish_date",
    "url",
    "metadata",
    "category",
];

pub const TWEET_HEADERS: [&str; 5] = ["text", "username", "date", "url", "category"];

/// One data row of a sheet, keyed by the sheet's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRecord {
    /// 1-based position in the sheet (the header is row 1).
    pub row_number: usize,
    pub fields: Vec<(String, String)>,
}

impl SheetRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(header, _)| header.trim().eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// 1-based column of `key` in this record's header layout.
    pub fn column_of(&self, key: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(header, _)| header.trim().eq_ignore_ascii_case(key))
            .map(|i| i + 1)
    }
}

impl Serialize for SheetRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (header, value) in &self.fields {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// Builds records from a raw value grid whose first row is the header.
/// Short rows are padded with empty strings; cells past the header are dropped.
pub fn records_from_values(values: Vec<Vec<String>>) -> Vec<SheetRecord> {
    let mut rows = values.into_iter();
    let Some(headers) = rows.next() else {
        return Vec::new();
    };

    rows.enumerate()
        .map(|(i, row)| {
            let mut cells = row.into_iter();
            let fields = headers
                .iter()
                .map(|header| (header.clone(), cells.next().unwrap_or_default()))
                .collect();
            SheetRecord {
                row_number: i + 2,
                fields,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    NewsArticle,
    Tweet,
    Unknown(String),
}

impl ContentKind {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "news article" => Self::NewsArticle,
            "tweet" => Self::Tweet,
            _ => Self::Unknown(normalized),
        }
    }
}

/// A row of the source worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub row_number: usize,
    pub url: Option<String>,
    pub kind: ContentKind,
    pub category: String,
    pub status: String,
}

impl SourceRow {
    /// Reads a source row. `status_column` is the 1-based column holding the
    /// done flag, so the flag is read from the same cell it is written to.
    pub fn from_record(record: &SheetRecord, status_column: usize) -> Self {
        let url = record
            .get("url")
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Self {
            row_number: record.row_number,
            url,
            kind: ContentKind::parse(record.get("type").unwrap_or_default()),
            category: record.get("category").unwrap_or_default().to_string(),
            status: status_column
                .checked_sub(1)
                .and_then(|i| record.fields.get(i))
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(DONE_FLAG)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ArticleRecord {
    /// Flattens the record into the "Scrapped news" column layout.
    pub fn destination_row(&self, url: &str, category: &str) -> Vec<String> {
        vec![
            self.title.clone(),
            self.text.clone(),
            self.authors.join(", "),
            self.publish_date.clone().unwrap_or_default(),
            url.to_string(),
            serde_json::to_string(&self.metadata).unwrap_or_default(),
            category.to_lowercase(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct PostRecord {
    pub text: String,
    pub username: String,
    pub date: String,
    pub url: String,
}

impl PostRecord {
    /// Flattens the record into the "Scrapped tweets" column layout.
    pub fn destination_row(&self, category: &str) -> Vec<String> {
        vec![
            self.text.clone(),
            self.username.clone(),
            self.date.clone(),
            self.url.clone(),
            category.to_lowercase(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_records_from_values_pads_short_rows() {
        let records = records_from_values(grid(&[
            &["url", "type", "scrapped", "category"],
            &["http://a", "tweet"],
            &["http://b", "news article", "yes", "Sports", "extra"],
        ]));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row_number, 2);
        assert_eq!(records[0].get("scrapped"), Some(""));
        assert_eq!(records[1].row_number, 3);
        assert_eq!(records[1].get("category"), Some("Sports"));
        assert_eq!(records[1].fields.len(), 4);
    }

    #[test]
    fn test_records_from_header_only() {
        assert!(records_from_values(grid(&[&["url", "type"]])).is_empty());
        assert!(records_from_values(Vec::new()).is_empty());
    }

    #[test]
    fn test_column_of_follows_header_layout() {
        let records = records_from_values(grid(&[
            &["url", "type", "category", "Scrapped"],
            &["http://a", "tweet", "x", ""],
        ]));
        assert_eq!(records[0].column_of("scrapped"), Some(4));
        assert_eq!(records[0].column_of("missing"), None);
    }

    #[test]
    fn test_source_row_parsing() {
        let records = records_from_values(grid(&[
            &["url", "type", "category", "scrapped"],
            &["  http://example.com/a ", "News Article", "Politics", "YES"],
            &["", "podcast", "Misc", ""],
        ]));

        let first = SourceRow::from_record(&records[0], 4);
        assert_eq!(first.url.as_deref(), Some("http://example.com/a"));
        assert_eq!(first.kind, ContentKind::NewsArticle);
        assert!(first.is_done());

        let second = SourceRow::from_record(&records[1], 4);
        assert_eq!(second.url, None);
        assert_eq!(second.kind, ContentKind::Unknown("podcast".to_string()));
        assert!(!second.is_done());
    }

    #[test]
    fn test_source_row_reads_status_by_position() {
        let records = records_from_values(grid(&[
            &["url", "type", "status", "category"],
            &["http://example.com/a", "news article", "yes", "Sports"],
        ]));

        assert!(SourceRow::from_record(&records[0], DEFAULT_STATUS_COLUMN).is_done());
        assert!(!SourceRow::from_record(&records[0], 4).is_done());
        assert!(!SourceRow::from_record(&records[0], 9).is_done());
    }

    #[test]
    fn test_article_destination_row() {
        let mut metadata = BTreeMap::new();
        metadata.insert("og:site_name".to_string(), "Example".to_string());
        let record = ArticleRecord {
            title: "Title".to_string(),
            text: "body".to_string(),
            authors: vec!["Author A".to_string(), "Author B".to_string()],
            publish_date: Some("2024-01-01".to_string()),
            metadata,
        };

        let row = record.destination_row("http://example.com/a", "Politics");
        assert_eq!(
            row,
            vec![
                "Title",
                "body",
                "Author A, Author B",
                "2024-01-01",
                "http://example.com/a",
                r#"{"og:site_name":"Example"}"#,
                "politics",
            ]
        );
    }

    #[test]
    fn test_post_destination_row() {
        let post = PostRecord {
            text: "hello".to_string(),
            username: "someone".to_string(),
            date: "January 1, 2024".to_string(),
            url: "https://twitter.com/someone/status/1".to_string(),
        };
        assert_eq!(post.destination_row("TECH")[4], "tech");
        assert_eq!(post.destination_row("TECH").len(), TWEET_HEADERS.len());
    }

    #[test]
    fn test_sheet_record_serializes_in_header_order() {
        let record = SheetRecord {
            row_number: 2,
            fields: vec![
                ("url".to_string(), "http://a".to_string()),
                ("category".to_string(), "x".to_string()),
            ],
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"url":"http://a","category":"x"}"#
        );
    }
}
