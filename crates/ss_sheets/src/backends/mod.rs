pub mod memory;

#[cfg(feature = "google")]
pub mod google;

pub use memory::{MemorySheetsClient, MemorySpreadsheet, MemoryStore};

#[cfg(feature = "google")]
pub use google::{GoogleSheetsClient, GoogleSpreadsheet};
