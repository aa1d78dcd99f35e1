use clap::{Args, Subcommand, ValueEnum};
use ss_core::{Error, Result, Settings, SheetsClient};
use url::Url;

use crate::pipeline::{open_workbook, RowProcessor};

#[derive(Args, Debug)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScraperCommands {
    /// Run one pass over the source worksheet and print the report
    Pass,
    /// Extract a single URL without touching the spreadsheet
    Url {
        url: String,
        /// Content kind; guessed from the host when omitted
        #[arg(long, value_enum)]
        kind: Option<UrlKind>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UrlKind {
    Article,
    Tweet,
}

impl UrlKind {
    pub fn guess(url: &str) -> Self {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()));
        match host.as_deref() {
            Some("twitter.com" | "x.com" | "mobile.twitter.com") => UrlKind::Tweet,
            _ => UrlKind::Article,
        }
    }
}

pub async fn handle_command(
    args: ScraperArgs,
    settings: &Settings,
    sheets: &dyn SheetsClient,
    processor: &RowProcessor,
) -> Result<()> {
    match args.command {
        ScraperCommands::Pass => {
            let book = open_workbook(settings, sheets).await?;
            let report = processor.run(book.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ScraperCommands::Url { url, kind } => {
            let kind = kind.unwrap_or_else(|| UrlKind::guess(&url));
            let json = match kind {
                UrlKind::Article => {
                    let article = processor.articles().extract(&url).await?.ok_or_else(|| {
                        Error::NotFound(format!("No article data found for URL: {url}"))
                    })?;
                    serde_json::to_string_pretty(&article)?
                }
                UrlKind::Tweet => {
                    let id = processor.posts().extract_id(&url).ok_or_else(|| {
                        Error::InvalidInput(format!("Could not derive a tweet ID from URL: {url}"))
                    })?;
                    let post = processor.posts().extract(&id).await?.ok_or_else(|| {
                        Error::NotFound(format!("No tweet data found for ID: {id}"))
                    })?;
                    serde_json::to_string_pretty(&post)?
                }
            };
            println!("{json}");
        }
    }
    Ok(())
}
