use std::sync::Arc;

use ss_core::{Result, Settings, SheetsClient};
use ss_scrappers::pipeline::{open_workbook, PassReport, RowProcessor};
use tokio::sync::Mutex;

pub struct AppState {
    pub settings: Settings,
    pub sheets: Arc<dyn SheetsClient>,
    pub processor: RowProcessor,
    /// Held for the whole pass so overlapping triggers cannot process a row twice.
    pass_lock: Mutex<()>,
}

impl AppState {
    pub fn new(settings: Settings, sheets: Arc<dyn SheetsClient>, processor: RowProcessor) -> Self {
        Self {
            settings,
            sheets,
            processor,
            pass_lock: Mutex::new(()),
        }
    }

    pub async fn run_pass(&self) -> Result<PassReport> {
        let _guard = self.pass_lock.lock().await;
        let book = open_workbook(&self.settings, self.sheets.as_ref()).await?;
        self.processor.run(book.as_ref()).await
    }
}
