//! Command handlers behind `quote-builder`.
//!
//! Each command loads what it needs from the repository, applies the
//! editor reducers or a lifecycle step, saves, and prints a short report.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Subcommand, ValueEnum};
use quote_core::calculations::common::format_money;
use quote_core::db::RepositoryRegistry;
use quote_core::editor::{
    self, BankingPatch, ClientPatch, Direction, LineItemField, VehiclePatch,
};
use quote_core::input::parse_decimal;
use quote_core::{LineItemId, Quote, QuoteLifecycle, QuoteRepository, QuoteStatus};
use quote_data::{CsvExporter, LineItemLoader, QuoteExporter, TextRenderer};
use quote_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info};

use crate::config::AppConfig;

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create and save a new draft quote.
    New {
        /// Quote date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        details: QuoteDetails,
    },

    /// Append a line item.
    AddItem {
        id: i64,
        #[arg(long)]
        code: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Unparseable amounts are treated as 0.
        #[arg(long, default_value = "1")]
        quantity: String,
        #[arg(long, default_value = "0")]
        unit_price: String,
    },

    /// Change one field of a line item.
    EditItem {
        id: i64,
        item: String,
        /// code, description, quantity or unit_price.
        field: String,
        value: String,
    },

    RemoveItem { id: i64, item: String },

    /// Swap a line item with its neighbour.
    MoveItem {
        id: i64,
        item: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Append line items from a CSV file (code,description,quantity,unit_price).
    Import { id: i64, file: PathBuf },

    /// Print the quote as a document.
    Show { id: i64 },

    List {
        #[arg(long)]
        status: Option<String>,
    },

    /// Update quote details and save without changing status.
    Save {
        id: i64,
        #[command(flatten)]
        details: QuoteDetails,
    },

    /// Validate a draft and mark it pending.
    Finalize { id: i64 },

    Approve { id: i64 },

    /// Convert the quote into an invoice.
    Convert { id: i64 },

    Export {
        id: i64,
        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    Delete { id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Csv,
}

/// Optional edits shared by `new` and `save`. Absent flags leave the
/// field untouched.
#[derive(Debug, Clone, Default, Args)]
pub struct QuoteDetails {
    #[arg(long)]
    pub client_name: Option<String>,
    #[arg(long)]
    pub client_address: Option<String>,
    #[arg(long)]
    pub client_phone: Option<String>,
    #[arg(long)]
    pub client_email: Option<String>,

    #[arg(long)]
    pub make: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub registration: Option<String>,
    #[arg(long)]
    pub vin: Option<String>,
    #[arg(long)]
    pub mileage: Option<String>,

    #[arg(long)]
    pub bank_name: Option<String>,
    #[arg(long)]
    pub account_holder: Option<String>,
    #[arg(long)]
    pub account_number: Option<String>,
    #[arg(long)]
    pub branch_code: Option<String>,

    #[arg(long)]
    pub show_vehicle: Option<bool>,
    #[arg(long)]
    pub show_banking: Option<bool>,
    #[arg(long)]
    pub show_item_codes: Option<bool>,
    #[arg(long)]
    pub show_notes: Option<bool>,

    /// VAT percentage, e.g. 15.
    #[arg(long)]
    pub vat_rate: Option<String>,
    #[arg(long)]
    pub valid_until: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl QuoteDetails {
    fn apply(
        self,
        quote: &Quote,
    ) -> Result<Quote> {
        let mut next = editor::update_client(
            quote,
            ClientPatch {
                name: self.client_name,
                address: self.client_address,
                phone: self.client_phone,
                email: self.client_email,
            },
        );
        next = editor::update_vehicle(
            &next,
            VehiclePatch {
                make: self.make,
                model: self.model,
                year: self.year,
                registration: self.registration,
                vin: self.vin,
                mileage: self.mileage,
            },
        );
        next = editor::update_banking(
            &next,
            BankingPatch {
                bank_name: self.bank_name,
                account_holder: self.account_holder,
                account_number: self.account_number,
                branch_code: self.branch_code,
            },
        );

        let mut settings = next.settings.clone();
        for (flag, value) in [
            (&mut settings.show_vehicle, self.show_vehicle),
            (&mut settings.show_banking, self.show_banking),
            (&mut settings.show_item_codes, self.show_item_codes),
            (&mut settings.show_notes, self.show_notes),
        ] {
            if let Some(value) = value {
                *flag = value;
            }
        }
        if settings != next.settings {
            next = editor::update_settings(&next, settings);
        }

        if let Some(rate) = self.vat_rate {
            // A mistyped rate would silently zero the VAT, so reject it here.
            let rate = parse_decimal(&rate).context("invalid --vat-rate")?;
            if rate.is_sign_negative() && !rate.is_zero() {
                bail!("--vat-rate cannot be negative (got {rate})");
            }
            next = editor::set_vat_rate(&next, rate);
        }
        if self.valid_until.is_some() {
            next = editor::set_dates(&next, None, self.valid_until);
        }
        if let Some(notes) = self.notes {
            next = editor::set_notes(&next, notes);
        }
        Ok(next)
    }
}

/// Runs commands against one repository.
pub struct App<'a> {
    repo: &'a dyn QuoteRepository,
    config: &'a AppConfig,
}

impl<'a> App<'a> {
    pub fn new(
        repo: &'a dyn QuoteRepository,
        config: &'a AppConfig,
    ) -> Self {
        Self { repo, config }
    }

    fn lifecycle(&self) -> QuoteLifecycle<'a, dyn QuoteRepository + 'a> {
        QuoteLifecycle::new(self.repo)
    }

    pub async fn run(
        &self,
        command: Command,
        out: &mut dyn Write,
    ) -> Result<()> {
        debug!(?command, "running command");
        match command {
            Command::New { date, details } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                let quote = self.new_quote(date, details).await?;
                writeln!(
                    out,
                    "Created quote {} (id {})",
                    quote.quote_number,
                    display_id(&quote)
                )?;
            }
            Command::AddItem {
                id,
                code,
                description,
                quantity,
                unit_price,
            } => {
                let quote = self.editable(id).await?;
                let (mut next, item_id) =
                    editor::add_line_item_with_id(&quote, LineItemId::generate());
                for (field, value) in [
                    (LineItemField::Code, code.unwrap_or_default()),
                    (LineItemField::Description, description),
                    (LineItemField::Quantity, quantity),
                    (LineItemField::UnitPrice, unit_price),
                ] {
                    next = editor::edit_line_item(&next, &item_id, field, &value);
                }
                let saved = self.lifecycle().save_draft(&next).await?;
                writeln!(out, "Added item {item_id}")?;
                write_totals(out, &saved)?;
            }
            Command::EditItem {
                id,
                item,
                field,
                value,
            } => {
                let Some(field) = LineItemField::parse(&field) else {
                    bail!("unknown field '{field}'; expected code, description, quantity or unit_price");
                };
                let quote = self.editable(id).await?;
                let item_id = existing_item(&quote, &item)?;
                let next = editor::edit_line_item(&quote, &item_id, field, &value);
                let saved = self.lifecycle().save_draft(&next).await?;
                write_totals(out, &saved)?;
            }
            Command::RemoveItem { id, item } => {
                let quote = self.editable(id).await?;
                let item_id = existing_item(&quote, &item)?;
                let next = editor::remove_line_item(&quote, &item_id);
                let saved = self.lifecycle().save_draft(&next).await?;
                writeln!(out, "Removed item {item_id}")?;
                write_totals(out, &saved)?;
            }
            Command::MoveItem {
                id,
                item,
                direction,
            } => {
                let quote = self.editable(id).await?;
                let item_id = existing_item(&quote, &item)?;
                let next = editor::move_line_item(&quote, &item_id, direction.into());
                let saved = self.lifecycle().save_draft(&next).await?;
                write_items(out, &saved)?;
            }
            Command::Import { id, file } => {
                self.editable(id).await?;
                let reader = File::open(&file)
                    .with_context(|| format!("Failed to open: {}", file.display()))?;
                let records = LineItemLoader::parse(reader)
                    .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
                let saved = LineItemLoader::load(self.repo, id, &records).await?;
                writeln!(out, "Imported {} line items", records.len())?;
                write_totals(out, &saved)?;
            }
            Command::Show { id } => {
                let quote = self.repo.get_quote(id).await?;
                self.renderer().export(&quote, out)?;
                write_items(out, &quote)?;
            }
            Command::List { status } => {
                let status = status
                    .map(|s| {
                        QuoteStatus::parse(&s).with_context(|| format!("unknown status '{s}'"))
                    })
                    .transpose()?;
                let quotes = self.repo.list_quotes(status).await?;
                for quote in &quotes {
                    writeln!(
                        out,
                        "{:>5}  {}  {}  {:<8}  {:<24}  {:>14}",
                        display_id(quote),
                        quote.quote_number,
                        quote.quote_date,
                        quote.status,
                        quote.client.name,
                        format_money(quote.totals().total)
                    )?;
                }
                writeln!(out, "{} quote(s)", quotes.len())?;
            }
            Command::Save { id, details } => {
                let quote = self.editable(id).await?;
                let next = details.apply(&quote)?;
                let saved = self.lifecycle().save_draft(&next).await?;
                writeln!(out, "Saved quote {}", saved.quote_number)?;
                write_totals(out, &saved)?;
            }
            Command::Finalize { id } => {
                let quote = self.repo.get_quote(id).await?;
                let pending = self.lifecycle().finalize(&quote).await?;
                writeln!(out, "Quote {} is {}", pending.quote_number, pending.status)?;
            }
            Command::Approve { id } => {
                let quote = self.repo.get_quote(id).await?;
                let approved = self.lifecycle().approve(&quote).await?;
                writeln!(out, "Quote {} is {}", approved.quote_number, approved.status)?;
            }
            Command::Convert { id } => {
                let quote = self.repo.get_quote(id).await?;
                let conversion = self.lifecycle().convert_to_invoice(&quote).await?;
                let invoice = self.repo.get_invoice(conversion.invoice_id).await?;
                writeln!(
                    out,
                    "Quote {} converted to invoice {} (id {})",
                    conversion.quote.quote_number, invoice.invoice_number, invoice.id
                )?;
            }
            Command::Export { id, format, output } => {
                let quote = self.repo.get_quote(id).await?;
                let exporter: Box<dyn QuoteExporter> = match format {
                    ExportFormat::Text => Box::new(self.renderer()),
                    ExportFormat::Csv => Box::new(CsvExporter),
                };
                match output {
                    Some(path) => {
                        let mut file = File::create(&path)
                            .with_context(|| format!("Failed to create: {}", path.display()))?;
                        exporter.export(&quote, &mut file)?;
                        writeln!(out, "Wrote {}", path.display())?;
                    }
                    None => exporter.export(&quote, out)?,
                }
            }
            Command::Delete { id } => {
                self.repo.delete_quote(id).await?;
                info!(id, "quote deleted");
                writeln!(out, "Deleted quote {id}")?;
            }
        }
        Ok(())
    }

    /// Numbers, stamps config defaults onto and saves a new draft.
    async fn new_quote(
        &self,
        date: NaiveDate,
        details: QuoteDetails,
    ) -> Result<Quote> {
        let defaults = &self.config.quotes;
        let mut quote = self
            .lifecycle()
            .new_quote(date)
            .await?
            .with_vat_rate(defaults.vat_rate);
        quote.banking = self.config.banking.clone();
        let valid_until = date
            .checked_add_days(Days::new(defaults.validity_days))
            .unwrap_or(date);
        quote = editor::set_dates(&quote, None, Some(valid_until));
        let quote = details.apply(&quote)?;

        let saved = self.lifecycle().save_draft(&quote).await?;
        info!(quote = %saved.quote_number, "draft created");
        Ok(saved)
    }

    /// Loads a quote that may still be edited.
    async fn editable(
        &self,
        id: i64,
    ) -> Result<Quote> {
        let quote = self.repo.get_quote(id).await?;
        if quote.status == QuoteStatus::Invoice {
            bail!("quote {} has been invoiced and can no longer be edited", quote.quote_number);
        }
        Ok(quote)
    }

    fn renderer(&self) -> TextRenderer {
        TextRenderer::new(self.config.merchant.name.clone())
    }
}

fn display_id(quote: &Quote) -> String {
    quote.id.map(|id| id.to_string()).unwrap_or_default()
}

fn existing_item(
    quote: &Quote,
    item: &str,
) -> Result<LineItemId> {
    quote
        .line_items()
        .iter()
        .find(|line| line.id.as_str() == item)
        .map(|line| line.id.clone())
        .with_context(|| format!("quote {} has no line item '{item}'", quote.quote_number))
}

fn write_totals(
    out: &mut dyn Write,
    quote: &Quote,
) -> Result<()> {
    let totals = quote.totals();
    writeln!(
        out,
        "Subtotal {}  VAT {}  Total {}",
        format_money(totals.subtotal),
        format_money(totals.tax),
        format_money(totals.total)
    )?;
    Ok(())
}

/// Line-item ids, which `edit-item`, `move-item` and `remove-item` take.
fn write_items(
    out: &mut dyn Write,
    quote: &Quote,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "Item ids:")?;
    for (position, item) in quote.line_items().iter().enumerate() {
        writeln!(out, "  {:>2}. {}  {}", position + 1, item.id, item.description)?;
    }
    Ok(())
}
