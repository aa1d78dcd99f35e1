use async_trait::async_trait;
use crate::types::SheetRecord;
use crate::Result;

/// An opened spreadsheet. Every call is an independent remote operation.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Header row of the named sheet, creating the sheet if it does not exist
    async fn headers(&self, sheet: &str) -> Result<Vec<String>>;

    /// All data rows of the named sheet, creating the sheet if it does not exist
    async fn get_rows(&self, sheet: &str) -> Result<Vec<SheetRecord>>;

    /// Append one row of positional values after the last row
    async fn append_row(&self, sheet: &str, values: &[String]) -> Result<()>;

    /// Write a single cell by 1-based coordinates
    async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: &str) -> Result<()>;

    /// Write `headers` as the first row of a sheet that has none yet
    async fn ensure_headers(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        if self.headers(sheet).await?.iter().all(|h| h.trim().is_empty()) {
            let row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
            self.append_row(sheet, &row).await?;
        }
        Ok(())
    }
}

/// Opens spreadsheets by URL or identifier.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Returns the name of the backend
    fn name(&self) -> &str;

    /// Whether opening a spreadsheet needs service-account credentials
    fn requires_credentials(&self) -> bool {
        true
    }

    async fn open(&self, reference: &str) -> Result<Box<dyn Spreadsheet>>;
}
