use anyhow::Context;
use clap::Parser;
use ss_core::Settings;
use ss_scrappers::cli::{handle_command, ScraperArgs, ScraperCommands};
use ss_scrappers::http::create_client;
use ss_scrappers::logging::init_logging;
use ss_scrappers::pipeline::{workbook_reference, RowProcessor};
use ss_web::{create_app, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Reference used for the in-memory backend when no spreadsheet is configured.
const MEMORY_REFERENCE: &str = "memory";

#[derive(Parser, Debug)]
#[command(author, version, about = "Spreadsheet-driven news and tweet scraper", long_about = None)]
pub struct Cli {
    /// Spreadsheet backend: google or memory
    #[arg(long, default_value = "google")]
    backend: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the scrape trigger, dataset and health endpoints
    Serve {
        /// Listen address; overrides BIND_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
    #[command(flatten)]
    Scrape(ScraperCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    init_logging(&settings.log_level);

    if cli.backend == "memory" && settings.spreadsheet_url.is_none() {
        settings.spreadsheet_url = Some(MEMORY_REFERENCE.to_string());
    }

    let http = create_client(&settings.scrape).context("failed to build HTTP client")?;
    let sheets = ss_sheets::create_client(&cli.backend, &settings, http.clone())?;
    if let Err(e) = workbook_reference(&settings, sheets.as_ref()) {
        warn!(error = %e, "Configuration is invalid; scrape requests will fail until it is fixed");
    }
    let processor = RowProcessor::from_settings(&settings, http);

    match cli.command {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.bind_addr.clone());
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(%addr, backend = sheets.name(), "Listening");

            let app = create_app(AppState::new(settings, sheets, processor));
            axum::serve(listener, app).await?;
        }
        Commands::Scrape(command) => {
            handle_command(ScraperArgs { command }, &settings, sheets.as_ref(), &processor).await?;
        }
    }

    Ok(())
}
