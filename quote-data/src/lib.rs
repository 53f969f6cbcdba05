//! CSV import of line items and the quote export formats.

pub mod export;
pub mod loader;

pub use export::{CsvExporter, ExportError, QuoteExporter, TextRenderer};
pub use loader::{LineItemLoader, LineItemLoaderError, LineItemRecord};
