//! Quote exporters.
//!
//! [`QuoteExporter`] is the seam document renderers plug into. Two are
//! shipped: [`CsvExporter`] for spreadsheets and [`TextRenderer`] for a
//! printable plain-text document.

use std::io::Write;

use quote_core::calculations::common::{format_money, round_half_up};
use quote_core::{Quote, QuoteStatus};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

pub trait QuoteExporter {
    /// Write `quote` to `writer`.
    fn export(
        &self,
        quote: &Quote,
        writer: &mut dyn Write,
    ) -> Result<(), ExportError>;
}

/// One row per line item followed by subtotal, VAT and total rows.
///
/// Amounts are rounded half-up to two decimals; quantities are written as
/// stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl QuoteExporter for CsvExporter {
    fn export(
        &self,
        quote: &Quote,
        writer: &mut dyn Write,
    ) -> Result<(), ExportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["code", "description", "quantity", "unit_price", "total"])?;

        for item in quote.line_items() {
            let quantity = item.quantity().normalize().to_string();
            let unit_price = cents(item.unit_price());
            let total = cents(item.total());
            csv_writer.write_record([
                item.code.as_deref().unwrap_or(""),
                item.description.as_str(),
                quantity.as_str(),
                unit_price.as_str(),
                total.as_str(),
            ])?;
        }

        let totals = quote.totals();
        let vat_label = format!("VAT ({}%)", quote.vat_rate().normalize());
        for (label, amount) in [
            ("Subtotal", totals.subtotal),
            (vat_label.as_str(), totals.tax),
            ("Total", totals.total),
        ] {
            csv_writer.write_record(["", label, "", "", cents(amount).as_str()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

fn cents(amount: Decimal) -> String {
    format!("{:.2}", round_half_up(amount))
}

/// Printable plain-text rendering of a quote or invoice.
///
/// Vehicle, banking, item-code and notes sections follow the quote's
/// [`DisplaySettings`](quote_core::DisplaySettings); empty sections are
/// skipped regardless.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    /// Business name printed in the heading.
    pub merchant_name: String,
    pub width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            merchant_name: String::new(),
            width: 72,
        }
    }
}

impl TextRenderer {
    pub fn new(merchant_name: impl Into<String>) -> Self {
        Self {
            merchant_name: merchant_name.into(),
            ..Self::default()
        }
    }

    fn rule(&self) -> String {
        "-".repeat(self.width)
    }

    fn amount_line(
        &self,
        label: &str,
        amount: &str,
    ) -> String {
        let pad = self.width.saturating_sub(label.chars().count());
        format!("{label}{amount:>pad$}")
    }
}

impl QuoteExporter for TextRenderer {
    fn export(
        &self,
        quote: &Quote,
        writer: &mut dyn Write,
    ) -> Result<(), ExportError> {
        let settings = &quote.settings;
        let title = if quote.status == QuoteStatus::Invoice {
            "INVOICE"
        } else {
            "QUOTATION"
        };

        if !self.merchant_name.is_empty() {
            writeln!(writer, "{}", self.merchant_name)?;
        }
        writeln!(writer, "{title} {}", quote.quote_number)?;
        writeln!(writer, "Date: {}", quote.quote_date.format("%d/%m/%Y"))?;
        if quote.status != QuoteStatus::Invoice {
            writeln!(writer, "Valid until: {}", quote.valid_until.format("%d/%m/%Y"))?;
        }
        writeln!(writer, "Status: {}", quote.status)?;
        writeln!(writer, "{}", self.rule())?;

        writeln!(writer, "Bill to:")?;
        for line in [
            &quote.client.name,
            &quote.client.address,
            &quote.client.phone,
            &quote.client.email,
        ] {
            if !line.is_empty() {
                writeln!(writer, "  {line}")?;
            }
        }

        let vehicle = &quote.vehicle;
        if settings.show_vehicle && *vehicle != Default::default() {
            writeln!(writer, "Vehicle:")?;
            let heading = [&vehicle.year, &vehicle.make, &vehicle.model]
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            if !heading.is_empty() {
                writeln!(writer, "  {heading}")?;
            }
            for (label, value) in [
                ("Registration", &vehicle.registration),
                ("VIN", &vehicle.vin),
                ("Mileage", &vehicle.mileage),
            ] {
                if !value.is_empty() {
                    writeln!(writer, "  {label}: {value}")?;
                }
            }
        }
        writeln!(writer, "{}", self.rule())?;

        for item in quote.line_items() {
            let description = match (&item.code, settings.show_item_codes) {
                (Some(code), true) => format!("[{code}] {}", item.description),
                _ => item.description.clone(),
            };
            writeln!(writer, "{description}")?;
            let detail = format!(
                "  {} x {}",
                item.quantity().normalize(),
                format_money(item.unit_price())
            );
            writeln!(writer, "{}", self.amount_line(&detail, &format_money(item.total())))?;
        }
        writeln!(writer, "{}", self.rule())?;

        let totals = quote.totals();
        let vat_label = format!("VAT ({}%)", quote.vat_rate().normalize());
        writeln!(writer, "{}", self.amount_line("Subtotal", &format_money(totals.subtotal)))?;
        writeln!(writer, "{}", self.amount_line(&vat_label, &format_money(totals.tax)))?;
        writeln!(writer, "{}", self.amount_line("Total", &format_money(totals.total)))?;

        if settings.show_notes && !quote.notes.trim().is_empty() {
            writeln!(writer, "{}", self.rule())?;
            writeln!(writer, "Notes:")?;
            for line in quote.notes.lines() {
                writeln!(writer, "  {line}")?;
            }
        }

        let banking = &quote.banking;
        if settings.show_banking && *banking != Default::default() {
            writeln!(writer, "{}", self.rule())?;
            writeln!(writer, "Banking details:")?;
            for (label, value) in [
                ("Bank", &banking.bank_name),
                ("Account holder", &banking.account_holder),
                ("Account number", &banking.account_number),
                ("Branch code", &banking.branch_code),
            ] {
                if !value.is_empty() {
                    writeln!(writer, "  {label}: {value}")?;
                }
            }
        }

        Ok(())
    }
}
