pub mod cli;
pub mod extractors;
pub mod http;
pub mod logging;
pub mod pipeline;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use extractors::{ArticleExtractor, HtmlArticleExtractor, PostExtractor, TweetExtractor};
pub use pipeline::{PassReport, RowOutcome, RowProcessor};

pub mod prelude {
    pub use super::extractors::{ArticleExtractor, PostExtractor};
    pub use super::pipeline::{PassReport, RowProcessor};
    pub use ss_core::{ArticleRecord, Error, PostRecord, Result};
}
