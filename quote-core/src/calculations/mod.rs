//! Money calculations for quotes.
//!
//! Totals are computed with exact decimal arithmetic; rounding to cents is
//! applied only when amounts are displayed or exported.

pub mod common;
pub mod totals;

pub use totals::{QuoteTotals, calculate_totals, subtotal};
