use std::io::Read;

use quote_core::editor::append_line_item;
use quote_core::input::parse_decimal;
use quote_core::{LineItem, LineItemId, Quote, QuoteRepository, QuoteStatus, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when importing line items.
#[derive(Debug, Error)]
pub enum LineItemLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Quote {0} has already been invoiced")]
    AlreadyInvoiced(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for LineItemLoaderError {
    fn from(err: csv::Error) -> Self {
        LineItemLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a line-item CSV file.
///
/// - `code`: optional part or service code (empty for none)
/// - `description`: text printed on the quote
/// - `quantity`: units, empty for zero
/// - `unit_price`: price per unit excluding VAT, empty for zero
///
/// Amounts may use commas as thousands separators (`"1,250.00"`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LineItemRecord {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code: Option<String>,
    pub description: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub quantity: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub unit_price: Decimal,
}

impl LineItemRecord {
    fn into_line_item(self) -> LineItem {
        LineItem::with_values(
            LineItemId::generate(),
            self.code,
            self.description,
            self.quantity,
            self.unit_price,
        )
    }
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) => parse_decimal(&s).map_err(serde::de::Error::custom),
        None => Ok(Decimal::ZERO),
    }
}

/// Imports line items from CSV into quotes.
///
/// Rows are appended after the quote's existing items in file order. The
/// quote keeps its status; an imported draft still has to pass validation
/// before it can be finalized.
pub struct LineItemLoader;

impl LineItemLoader {
    /// Parse line-item records from a CSV reader with a
    /// `code,description,quantity,unit_price` header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<LineItemRecord>, LineItemLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: LineItemRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Append `records` to a copy of `quote`. Each row gets a fresh id.
    pub fn apply(
        quote: &Quote,
        records: &[LineItemRecord],
    ) -> Quote {
        records.iter().cloned().fold(quote.clone(), |next, record| {
            append_line_item(&next, record.into_line_item())
        })
    }

    /// Append `records` to the stored quote `quote_id` and save it.
    ///
    /// Returns the quote as stored after the import.
    pub async fn load<R: QuoteRepository + ?Sized>(
        repo: &R,
        quote_id: i64,
        records: &[LineItemRecord],
    ) -> Result<Quote, LineItemLoaderError> {
        let quote = repo.get_quote(quote_id).await?;
        if quote.status == QuoteStatus::Invoice {
            return Err(LineItemLoaderError::AlreadyInvoiced(quote.quote_number));
        }

        let updated = Self::apply(&quote, records);
        repo.save_quote(&updated).await?;
        info!(
            quote = %updated.quote_number,
            imported = records.len(),
            "line items imported"
        );

        let stored = repo.get_quote(quote_id).await?;
        debug!(total = %stored.totals().total, "quote totals after import");
        Ok(stored)
    }
}
