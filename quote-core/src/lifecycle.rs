//! Quote status lifecycle.
//!
//! ```text
//! draft ──finalize──▶ pending ──approve──▶ approved
//!   │                    │                    │
//!   └─────────────── convert to invoice ──────┴──▶ invoice
//! ```
//!
//! Leaving `draft` requires a complete quote (see [`validate_for_issue`]).
//! Converting requires the quote to be saved first. Every operation takes
//! the caller's quote by reference and only hands back a new value once the
//! repository call succeeded, so a failure leaves the caller's copy exactly
//! as it was.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{QuoteRepository, RepositoryError};
use crate::models::quote_number::format_quote_number;
use crate::models::{Quote, QuoteStatus};

/// Why a quote is not ready to leave `draft`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteValidationError {
    #[error("client name and address are required")]
    MissingClientInfo,

    #[error("the quote has no line items")]
    NoLineItems,

    /// 1-based positions of the offending rows.
    #[error("line items {positions:?} need a description and a unit price above zero")]
    IncompleteLineItems { positions: Vec<usize> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] QuoteValidationError),

    #[error("quote must be saved as a draft before it can be converted to an invoice")]
    NotPersisted,

    #[error("quote cannot move from {from} to {to}")]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checks that a quote is complete enough to be issued.
///
/// Reports the first failing category, in this order: client info, no line
/// items, incomplete line items.
pub fn validate_for_issue(quote: &Quote) -> Result<(), QuoteValidationError> {
    if quote.client.name.trim().is_empty() || quote.client.address.trim().is_empty() {
        return Err(QuoteValidationError::MissingClientInfo);
    }
    if quote.line_items().is_empty() {
        return Err(QuoteValidationError::NoLineItems);
    }

    let positions: Vec<usize> = quote
        .line_items()
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_complete())
        .map(|(index, _)| index + 1)
        .collect();
    if !positions.is_empty() {
        return Err(QuoteValidationError::IncompleteLineItems { positions });
    }

    Ok(())
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceConversion {
    /// Identifier of the invoice to navigate to.
    pub invoice_id: i64,
    pub quote: Quote,
}

/// Drives quotes through their statuses against a repository.
pub struct QuoteLifecycle<'a, R: QuoteRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: QuoteRepository + ?Sized> QuoteLifecycle<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Next free quote number for `date`.
    pub async fn next_quote_number(
        &self,
        date: NaiveDate,
    ) -> Result<String, LifecycleError> {
        let last = self.repo.last_quote_sequence_on(date).await?;
        Ok(format_quote_number(date, last + 1))
    }

    /// A transient draft dated `date` with the next free number.
    pub async fn new_quote(
        &self,
        date: NaiveDate,
    ) -> Result<Quote, LifecycleError> {
        let number = self.next_quote_number(date).await?;
        debug!(quote = %number, "new draft quote");
        Ok(Quote::new_draft(number, date))
    }

    /// Persists the quote without touching its status. No validation runs,
    /// so incomplete drafts can be saved.
    ///
    /// A copy whose status is behind the stored one (say a draft kept around
    /// after the quote was converted) is refused.
    pub async fn save_draft(
        &self,
        quote: &Quote,
    ) -> Result<Quote, LifecycleError> {
        self.check_stored_status(quote, quote.status).await?;
        let id = self.repo.save_quote(quote).await?;
        debug!(quote = %quote.quote_number, id, "quote saved");
        self.reload(id).await
    }

    /// Validates and moves a draft to `pending`, saving it.
    pub async fn finalize(
        &self,
        quote: &Quote,
    ) -> Result<Quote, LifecycleError> {
        self.transition(quote, QuoteStatus::Pending).await
    }

    /// Moves a pending quote to `approved`, saving it.
    pub async fn approve(
        &self,
        quote: &Quote,
    ) -> Result<Quote, LifecycleError> {
        self.transition(quote, QuoteStatus::Approved).await
    }

    /// Turns a saved quote into an invoice.
    ///
    /// Unsaved quotes are rejected with [`LifecycleError::NotPersisted`].
    /// The latest edits are saved before the repository converts the
    /// stored copy.
    pub async fn convert_to_invoice(
        &self,
        quote: &Quote,
    ) -> Result<InvoiceConversion, LifecycleError> {
        let Some(id) = quote.id else {
            warn!(quote = %quote.quote_number, "conversion refused: quote not saved");
            return Err(LifecycleError::NotPersisted);
        };
        check_transition(quote, QuoteStatus::Invoice)?;
        self.check_stored_status(quote, QuoteStatus::Invoice).await?;

        self.repo.save_quote(quote).await?;
        let invoice_id = self.repo.convert_to_invoice(id).await?;
        info!(quote = %quote.quote_number, id, invoice_id, "quote converted to invoice");

        Ok(InvoiceConversion {
            invoice_id,
            quote: self.reload(id).await?,
        })
    }

    async fn transition(
        &self,
        quote: &Quote,
        to: QuoteStatus,
    ) -> Result<Quote, LifecycleError> {
        check_transition(quote, to)?;
        self.check_stored_status(quote, to).await?;

        let mut next = quote.clone();
        next.status = to;
        let id = self.repo.save_quote(&next).await?;
        info!(quote = %quote.quote_number, id, from = %quote.status, %to, "quote status changed");
        self.reload(id).await
    }

    /// Refuses to write `to` over a stored copy that is already further
    /// along. Unsaved quotes have nothing to compare against.
    async fn check_stored_status(
        &self,
        quote: &Quote,
        to: QuoteStatus,
    ) -> Result<(), LifecycleError> {
        let Some(id) = quote.id else {
            return Ok(());
        };
        let stored = self.repo.get_quote(id).await?.status;
        if stored > quote.status || stored == QuoteStatus::Invoice {
            warn!(quote = %quote.quote_number, id, %stored, copy = %quote.status, "stale quote refused");
            return Err(LifecycleError::InvalidTransition { from: stored, to });
        }
        Ok(())
    }

    async fn reload(
        &self,
        id: i64,
    ) -> Result<Quote, LifecycleError> {
        Ok(self.repo.get_quote(id).await?)
    }
}

fn check_transition(
    quote: &Quote,
    to: QuoteStatus,
) -> Result<(), LifecycleError> {
    if !quote.status.can_transition_to(to) {
        return Err(LifecycleError::InvalidTransition {
            from: quote.status,
            to,
        });
    }
    if quote.status == QuoteStatus::Draft {
        validate_for_issue(quote)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::editor::{ClientPatch, update_client};
    use crate::models::quote_number::parse_document_number;
    use crate::models::{Invoice, LineItem};

    /// In-memory repository that counts writes.
    #[derive(Default)]
    struct MemoryRepository {
        quotes: Mutex<BTreeMap<i64, Quote>>,
        invoices: Mutex<BTreeMap<i64, Invoice>>,
        saves: Mutex<usize>,
        fail_saves: bool,
    }

    impl MemoryRepository {
        fn failing() -> Self {
            Self {
                fail_saves: true,
                ..Default::default()
            }
        }

        fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    #[async_trait]
    impl QuoteRepository for MemoryRepository {
        async fn save_quote(
            &self,
            quote: &Quote,
        ) -> Result<i64, RepositoryError> {
            if self.fail_saves {
                return Err(RepositoryError::Connection("offline".to_string()));
            }
            *self.saves.lock().unwrap() += 1;
            let mut quotes = self.quotes.lock().unwrap();
            let id = match quote.id {
                Some(id) if quotes.contains_key(&id) => id,
                Some(_) => return Err(RepositoryError::NotFound),
                None => quotes.keys().max().map_or(1, |max| max + 1),
            };
            let mut stored = quote.clone();
            stored.id = Some(id);
            quotes.insert(id, stored);
            Ok(id)
        }

        async fn get_quote(
            &self,
            id: i64,
        ) -> Result<Quote, RepositoryError> {
            self.quotes
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn delete_quote(
            &self,
            id: i64,
        ) -> Result<(), RepositoryError> {
            self.quotes
                .lock()
                .unwrap()
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }

        async fn list_quotes(
            &self,
            status: Option<QuoteStatus>,
        ) -> Result<Vec<Quote>, RepositoryError> {
            Ok(self
                .quotes
                .lock()
                .unwrap()
                .values()
                .filter(|q| status.is_none_or(|s| q.status == s))
                .cloned()
                .collect())
        }

        async fn last_quote_sequence_on(
            &self,
            date: NaiveDate,
        ) -> Result<u32, RepositoryError> {
            Ok(self
                .quotes
                .lock()
                .unwrap()
                .values()
                .filter_map(|q| parse_document_number(&q.quote_number))
                .filter(|n| n.date == date)
                .map(|n| n.seq)
                .max()
                .unwrap_or(0))
        }

        async fn convert_to_invoice(
            &self,
            quote_id: i64,
        ) -> Result<i64, RepositoryError> {
            let mut quotes = self.quotes.lock().unwrap();
            let quote = quotes.get_mut(&quote_id).ok_or(RepositoryError::NotFound)?;
            quote.status = QuoteStatus::Invoice;
            let mut invoices = self.invoices.lock().unwrap();
            let id = invoices.len() as i64 + 100;
            invoices.insert(
                id,
                Invoice {
                    id,
                    quote_id,
                    invoice_number: format!("INV{}", &quote.quote_number[1..]),
                    issued_at: Utc::now(),
                },
            );
            Ok(id)
        }

        async fn get_invoice(
            &self,
            id: i64,
        ) -> Result<Invoice, RepositoryError> {
            self.invoices
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn complete_quote() -> Quote {
        let quote = Quote::new_draft("Q010625001", date()).with_line_items(vec![
            LineItem::with_values("a".into(), None, "Brake pads", dec!(2), dec!(100)),
            LineItem::with_values("b".into(), None, "Labour", dec!(1), dec!(50)),
        ]);
        update_client(
            &quote,
            ClientPatch {
                name: Some("Acme Fleet".into()),
                address: Some("1 Depot Rd".into()),
                ..Default::default()
            },
        )
    }

    // =========================================================================
    // validate_for_issue
    // =========================================================================

    #[test]
    fn complete_quote_is_valid() {
        assert_eq!(validate_for_issue(&complete_quote()), Ok(()));
    }

    #[test]
    fn missing_address_is_client_info_error() {
        let quote = update_client(
            &complete_quote(),
            ClientPatch {
                address: Some("   ".into()),
                ..Default::default()
            },
        );

        assert_eq!(validate_for_issue(&quote), Err(QuoteValidationError::MissingClientInfo));
    }

    #[test]
    fn client_info_is_checked_before_line_items() {
        let quote = Quote::new_draft("Q010625001", date());

        assert_eq!(validate_for_issue(&quote), Err(QuoteValidationError::MissingClientInfo));
    }

    #[test]
    fn empty_quote_reports_no_line_items() {
        let quote = complete_quote().with_line_items(Vec::new());

        assert_eq!(validate_for_issue(&quote), Err(QuoteValidationError::NoLineItems));
    }

    #[test]
    fn incomplete_rows_are_listed_by_position() {
        let quote = complete_quote().with_line_items(vec![
            LineItem::with_values("a".into(), None, "Brake pads", dec!(2), dec!(100)),
            LineItem::with_values("b".into(), None, "", dec!(1), dec!(50)),
            LineItem::with_values("c".into(), None, "Inspection", dec!(1), dec!(0)),
        ]);

        assert_eq!(
            validate_for_issue(&quote),
            Err(QuoteValidationError::IncompleteLineItems {
                positions: vec![2, 3]
            })
        );
    }

    // =========================================================================
    // QuoteLifecycle
    // =========================================================================

    #[tokio::test]
    async fn new_quote_numbers_follow_saved_count() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);

        let first = lifecycle.new_quote(date()).await.unwrap();
        lifecycle.save_draft(&first).await.unwrap();
        let second = lifecycle.new_quote(date()).await.unwrap();

        assert_eq!(first.quote_number, "Q010625001");
        assert_eq!(second.quote_number, "Q010625002");
        assert_eq!(second.status, QuoteStatus::Draft);
    }

    #[tokio::test]
    async fn deleting_a_quote_does_not_reuse_a_live_number() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let first = lifecycle.new_quote(date()).await.unwrap();
        let first = lifecycle.save_draft(&first).await.unwrap();
        let second = lifecycle.new_quote(date()).await.unwrap();
        lifecycle.save_draft(&second).await.unwrap();

        repo.delete_quote(first.id.unwrap()).await.unwrap();
        let third = lifecycle.new_quote(date()).await.unwrap();

        assert_eq!(third.quote_number, "Q010625003");
    }

    #[tokio::test]
    async fn save_draft_assigns_id_and_skips_validation() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let quote = Quote::new_draft("Q010625001", date());

        let saved = lifecycle.save_draft(&quote).await.unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.status, QuoteStatus::Draft);
        assert_eq!(quote.id, None);
    }

    #[tokio::test]
    async fn finalize_moves_draft_to_pending() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);

        let pending = lifecycle.finalize(&complete_quote()).await.unwrap();

        assert_eq!(pending.status, QuoteStatus::Pending);
        assert!(pending.is_persisted());
    }

    #[tokio::test]
    async fn finalize_without_line_items_is_rejected_before_saving() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let quote = complete_quote().with_line_items(Vec::new());

        let err = lifecycle.finalize(&quote).await.unwrap_err();

        assert_eq!(err, LifecycleError::Validation(QuoteValidationError::NoLineItems));
        assert_eq!(err.to_string(), "the quote has no line items");
        assert_eq!(repo.save_count(), 0);
        assert_eq!(quote.status, QuoteStatus::Draft);
    }

    #[tokio::test]
    async fn approve_requires_pending() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);

        let err = lifecycle.approve(&complete_quote()).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: QuoteStatus::Draft,
                to: QuoteStatus::Approved,
            }
        );
    }

    #[tokio::test]
    async fn finalize_then_approve() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);

        let pending = lifecycle.finalize(&complete_quote()).await.unwrap();
        let approved = lifecycle.approve(&pending).await.unwrap();

        assert_eq!(approved.status, QuoteStatus::Approved);
        assert_eq!(approved.id, pending.id);
    }

    #[tokio::test]
    async fn convert_unsaved_quote_is_rejected() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let quote = complete_quote();

        let err = lifecycle.convert_to_invoice(&quote).await.unwrap_err();

        assert_eq!(err, LifecycleError::NotPersisted);
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn convert_saved_draft_returns_invoice_id() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();

        let conversion = lifecycle.convert_to_invoice(&saved).await.unwrap();

        assert_eq!(conversion.quote.status, QuoteStatus::Invoice);
        let invoice = repo.get_invoice(conversion.invoice_id).await.unwrap();
        assert_eq!(invoice.quote_id, saved.id.unwrap());
        assert_eq!(invoice.invoice_number, "INV010625001");
    }

    #[tokio::test]
    async fn convert_incomplete_draft_is_rejected() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle
            .save_draft(&Quote::new_draft("Q010625001", date()))
            .await
            .unwrap();

        let err = lifecycle.convert_to_invoice(&saved).await.unwrap_err();

        assert_eq!(err, LifecycleError::Validation(QuoteValidationError::MissingClientInfo));
    }

    #[tokio::test]
    async fn invoice_cannot_be_converted_again() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();
        let converted = lifecycle.convert_to_invoice(&saved).await.unwrap().quote;

        let err = lifecycle.convert_to_invoice(&converted).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: QuoteStatus::Invoice,
                to: QuoteStatus::Invoice,
            }
        );
    }

    #[tokio::test]
    async fn stale_draft_cannot_overwrite_invoice() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();
        lifecycle.convert_to_invoice(&saved).await.unwrap();

        let err = lifecycle.save_draft(&saved).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: QuoteStatus::Invoice,
                to: QuoteStatus::Draft,
            }
        );
        let stored = repo.get_quote(saved.id.unwrap()).await.unwrap();
        assert_eq!(stored.status, QuoteStatus::Invoice);
    }

    #[tokio::test]
    async fn stale_draft_cannot_be_finalized_over_approved() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();
        let pending = lifecycle.finalize(&saved).await.unwrap();
        lifecycle.approve(&pending).await.unwrap();
        let saves = repo.save_count();

        let err = lifecycle.finalize(&saved).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: QuoteStatus::Approved,
                to: QuoteStatus::Pending,
            }
        );
        assert_eq!(repo.save_count(), saves);
    }

    #[tokio::test]
    async fn stale_draft_cannot_be_converted_again() {
        let repo = MemoryRepository::default();
        let lifecycle = QuoteLifecycle::new(&repo);
        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();
        lifecycle.convert_to_invoice(&saved).await.unwrap();

        let err = lifecycle.convert_to_invoice(&saved).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: QuoteStatus::Invoice,
                to: QuoteStatus::Invoice,
            }
        );
    }

    #[tokio::test]
    async fn repository_failure_leaves_quote_unchanged() {
        let repo = MemoryRepository::failing();
        let lifecycle = QuoteLifecycle::new(&repo);
        let quote = complete_quote();

        let err = lifecycle.finalize(&quote).await.unwrap_err();

        assert_eq!(
            err,
            LifecycleError::Repository(RepositoryError::Connection("offline".to_string()))
        );
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.id, None);
    }

    #[tokio::test]
    async fn works_through_a_trait_object() {
        let repo: Box<dyn QuoteRepository> = Box::new(MemoryRepository::default());
        let lifecycle = QuoteLifecycle::new(&*repo);

        let saved = lifecycle.save_draft(&complete_quote()).await.unwrap();

        assert_eq!(repo.list_quotes(None).await.unwrap().len(), 1);
        assert_eq!(saved.id, Some(1));
    }
}
