//! Human-readable document numbers.
//!
//! Quotes are numbered `Q<ddMMyy><seq>` and invoices `INV<ddMMyy><seq>`,
//! where `seq` is a per-day counter starting at 1 and padded to three
//! digits. Counters above 999 simply grow wider.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const QUOTE_PREFIX: &str = "Q";
const INVOICE_PREFIX: &str = "INV";

static DOCUMENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Q|INV)(\d{2})(\d{2})(\d{2})(\d{3,})$").expect("valid document number pattern")
});

/// Formats a quote number for `date` with the given 1-based sequence.
pub fn format_quote_number(
    date: NaiveDate,
    seq: u32,
) -> String {
    format_number(QUOTE_PREFIX, date, seq)
}

/// Formats an invoice number for `date` with the given 1-based sequence.
pub fn format_invoice_number(
    date: NaiveDate,
    seq: u32,
) -> String {
    format_number(INVOICE_PREFIX, date, seq)
}

/// Everything before the sequence of a quote number for `date`.
pub fn quote_number_prefix(date: NaiveDate) -> String {
    number_prefix(QUOTE_PREFIX, date)
}

/// Everything before the sequence of an invoice number for `date`.
pub fn invoice_number_prefix(date: NaiveDate) -> String {
    number_prefix(INVOICE_PREFIX, date)
}

fn number_prefix(
    prefix: &str,
    date: NaiveDate,
) -> String {
    format!("{prefix}{}", date.format("%d%m%y"))
}

fn format_number(
    prefix: &str,
    date: NaiveDate,
    seq: u32,
) -> String {
    format!("{}{seq:03}", number_prefix(prefix, date))
}

/// A parsed quote or invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentNumber {
    pub is_invoice: bool,
    pub date: NaiveDate,
    pub seq: u32,
}

/// Parses a number produced by [`format_quote_number`] or
/// [`format_invoice_number`]. Returns `None` for anything else, including
/// impossible calendar dates.
pub fn parse_document_number(s: &str) -> Option<DocumentNumber> {
    let caps = DOCUMENT_NUMBER.captures(s.trim())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let month: u32 = caps.get(3)?.as_str().parse().ok()?;
    let year: i32 = caps.get(4)?.as_str().parse().ok()?;
    let seq: u32 = caps.get(5)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(2000 + year, month, day)?;

    Some(DocumentNumber {
        is_invoice: caps.get(1)?.as_str() == INVOICE_PREFIX,
        date,
        seq,
    })
}
