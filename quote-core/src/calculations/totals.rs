//! Quote totals.
//!
//! | Amount     | Formula                            |
//! |------------|------------------------------------|
//! | `subtotal` | Σ `quantity × unit_price`          |
//! | `tax`      | `subtotal × vat_rate / 100`        |
//! | `total`    | `subtotal + tax`                   |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use quote_core::calculations::calculate_totals;
//! use quote_core::LineItem;
//!
//! let items = vec![
//!     LineItem::with_values("a".into(), None, "Brake pads", dec!(2), dec!(100)),
//!     LineItem::with_values("b".into(), None, "Labour", dec!(1), dec!(50)),
//! ];
//!
//! let totals = calculate_totals(&items, dec!(15));
//!
//! assert_eq!(totals.subtotal, dec!(250));
//! assert_eq!(totals.tax, dec!(37.5));
//! assert_eq!(totals.total, dec!(287.5));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::LineItem;

/// Derived money amounts of a quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Sum of every row's `quantity × unit_price`, saturating at
/// [`Decimal::MAX`].
pub fn subtotal(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.total()))
}

/// Computes subtotal, tax and total for `items` at `vat_rate` percent.
///
/// Pure and unrounded; calling it twice on the same input gives the same
/// result. Amounts saturate instead of overflowing.
pub fn calculate_totals(
    items: &[LineItem],
    vat_rate: Decimal,
) -> QuoteTotals {
    let subtotal = subtotal(items);
    let tax = subtotal.saturating_mul(vat_rate) / Decimal::ONE_HUNDRED;

    QuoteTotals {
        subtotal,
        tax,
        total: subtotal.saturating_add(tax),
    }
}
