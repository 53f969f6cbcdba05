//! Quote and invoice core: data model, totals, line-item editing and the
//! status lifecycle, plus the repository seam used to persist quotes.

pub mod calculations;
pub mod db;
pub mod editor;
pub mod input;
pub mod lifecycle;
pub mod models;

pub use db::repository::{QuoteRepository, RepositoryError};
pub use lifecycle::{InvoiceConversion, LifecycleError, QuoteLifecycle, QuoteValidationError};
pub use models::*;
