pub mod config;
pub mod error;
pub mod sheets;
pub mod types;

pub use config::{ScrapeSettings, ServiceAccountKey, Settings, SheetNames, SheetsConfig};
pub use error::{Error, Result};
pub use sheets::{SheetsClient, Spreadsheet};
pub use types::{
    ArticleRecord, ContentKind, PostRecord, SheetRecord, SourceRow, DEFAULT_STATUS_COLUMN,
    DONE_FLAG, NEWS_HEADERS, TWEET_HEADERS,
};

pub mod prelude {
    pub use crate::{ArticleRecord, Error, PostRecord, Result, SheetsClient, Spreadsheet};
}
