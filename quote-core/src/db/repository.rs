use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Invoice, Quote, QuoteStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for quotes and the invoices created from them.
///
/// Saves are last-write-wins: there is no version check before an update.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Inserts the quote when it has no id, otherwise overwrites the stored
    /// copy. Returns the quote's id.
    async fn save_quote(
        &self,
        quote: &Quote,
    ) -> Result<i64, RepositoryError>;

    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<Quote, RepositoryError>;

    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    /// Most recently updated first.
    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<Quote>, RepositoryError>;

    /// Highest sequence among stored quote numbers for `date`, or 0 when
    /// there are none. Drives quote numbering.
    async fn last_quote_sequence_on(
        &self,
        date: NaiveDate,
    ) -> Result<u32, RepositoryError>;

    /// Marks the stored quote as an invoice and returns the invoice id.
    /// Converting an already converted quote returns the existing id.
    async fn convert_to_invoice(
        &self,
        quote_id: i64,
    ) -> Result<i64, RepositoryError>;

    async fn get_invoice(
        &self,
        id: i64,
    ) -> Result<Invoice, RepositoryError>;
}
