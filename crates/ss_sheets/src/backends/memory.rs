use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ss_core::types::records_from_values;
use ss_core::{Error, Result, SheetRecord, SheetsClient, Spreadsheet};
use tokio::sync::RwLock;

/// Sheets held in process memory, including their header rows.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sheets: HashMap<String, Vec<Vec<String>>>,
    failing: HashSet<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet<R, C>(mut self, name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.sheets.insert(name.to_string(), rows);
        self
    }

    /// Every write to `name` fails with a resource error.
    pub fn with_failing_sheet(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Vec<Vec<String>>> {
        if self.failing.contains(name) {
            return Err(Error::resource(format!("Worksheet '{name}' rejected the write")));
        }
        self.writes += 1;
        Ok(self.sheets.entry(name.to_string()).or_default())
    }

    fn append_row(&mut self, name: &str, values: &[String]) -> Result<()> {
        self.sheet_mut(name)?.push(values.to_vec());
        Ok(())
    }

    fn update_cell(&mut self, name: &str, row: usize, col: usize, value: &str) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(Error::InvalidInput(format!(
                "Cell coordinates are 1-based, got ({row}, {col})"
            )));
        }
        let sheet = self.sheet_mut(name)?;
        if sheet.len() < row {
            sheet.resize(row, Vec::new());
        }
        let cells = &mut sheet[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemorySpreadsheet {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemorySpreadsheet {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Raw contents of a sheet, header row included.
    pub async fn sheet(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.store.read().await.sheets.get(name).cloned()
    }

    /// Number of successful writes (appends and cell updates) so far.
    pub async fn write_count(&self) -> usize {
        self.store.read().await.writes
    }
}

#[async_trait]
impl Spreadsheet for MemorySpreadsheet {
    async fn headers(&self, sheet: &str) -> Result<Vec<String>> {
        let mut store = self.store.write().await;
        Ok(store
            .sheets
            .entry(sheet.to_string())
            .or_default()
            .first()
            .cloned()
            .unwrap_or_default())
    }

    async fn get_rows(&self, sheet: &str) -> Result<Vec<SheetRecord>> {
        let mut store = self.store.write().await;
        let values = store.sheets.entry(sheet.to_string()).or_default().clone();
        Ok(records_from_values(values))
    }

    async fn append_row(&self, sheet: &str, values: &[String]) -> Result<()> {
        self.store.write().await.append_row(sheet, values)
    }

    async fn update_cell(&self, sheet: &str, row: usize, col: usize, value: &str) -> Result<()> {
        self.store.write().await.update_cell(sheet, row, col, value)
    }
}

/// Hands out the same in-memory spreadsheet for every reference.
#[derive(Clone)]
pub struct MemorySheetsClient {
    spreadsheet: MemorySpreadsheet,
}

impl MemorySheetsClient {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            spreadsheet: MemorySpreadsheet::new(store),
        }
    }

    pub fn spreadsheet(&self) -> &MemorySpreadsheet {
        &self.spreadsheet
    }
}

impl Default for MemorySheetsClient {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

#[async_trait]
impl SheetsClient for MemorySheetsClient {
    fn name(&self) -> &str {
        "memory"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn open(&self, reference: &str) -> Result<Box<dyn Spreadsheet>> {
        if reference.trim().is_empty() {
            return Err(Error::resource("Failed to open spreadsheet '': empty reference"));
        }
        Ok(Box::new(self.spreadsheet.clone()))
    }
}
