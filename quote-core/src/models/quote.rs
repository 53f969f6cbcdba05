use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::totals::{QuoteTotals, calculate_totals};
use crate::models::{LineItem, QuoteStatus};

/// VAT percentage applied to new quotes unless configured otherwise.
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

/// Days a new quote stays valid unless configured otherwise.
pub const DEFAULT_VALIDITY_DAYS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub year: String,
    pub registration: String,
    pub vin: String,
    pub mileage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankingInfo {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub branch_code: String,
}

/// Presentation options. Nothing here affects the numbers on a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub primary_color: String,
    pub accent_color: String,
    pub font_family: String,
    pub show_vehicle: bool,
    pub show_banking: bool,
    pub show_item_codes: bool,
    pub show_notes: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            primary_color: "#1f2937".to_string(),
            accent_color: "#2563eb".to_string(),
            font_family: "Helvetica".to_string(),
            show_vehicle: true,
            show_banking: true,
            show_item_codes: true,
            show_notes: true,
        }
    }
}

/// A quote and everything printed on it.
///
/// `line_items`, `vat_rate` and `totals` are private: the totals are cached
/// and re-derived by every method that touches the other two, so a quote
/// can never carry stale totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Assigned by the repository on first save.
    pub id: Option<i64>,
    pub quote_number: String,
    pub quote_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub status: QuoteStatus,
    pub client: ClientInfo,
    pub vehicle: VehicleInfo,
    pub banking: BankingInfo,
    pub settings: DisplaySettings,
    pub notes: String,
    line_items: Vec<LineItem>,
    vat_rate: Decimal,
    totals: QuoteTotals,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// A transient draft with no line items, valid for
    /// [`DEFAULT_VALIDITY_DAYS`] at [`DEFAULT_VAT_RATE`].
    pub fn new_draft(
        quote_number: impl Into<String>,
        quote_date: NaiveDate,
    ) -> Self {
        let valid_until = quote_date
            .checked_add_days(Days::new(DEFAULT_VALIDITY_DAYS))
            .unwrap_or(quote_date);

        Self {
            id: None,
            quote_number: quote_number.into(),
            quote_date,
            valid_until,
            status: QuoteStatus::Draft,
            client: ClientInfo::default(),
            vehicle: VehicleInfo::default(),
            banking: BankingInfo::default(),
            settings: DisplaySettings::default(),
            notes: String::new(),
            line_items: Vec::new(),
            vat_rate: DEFAULT_VAT_RATE,
            totals: QuoteTotals::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Replaces the line items, re-deriving totals.
    pub fn with_line_items(
        mut self,
        line_items: Vec<LineItem>,
    ) -> Self {
        self.line_items = line_items;
        self.recalculate();
        self
    }

    /// Replaces the VAT percentage, re-deriving totals. Negative rates are
    /// clamped to zero.
    pub fn with_vat_rate(
        mut self,
        vat_rate: Decimal,
    ) -> Self {
        self.vat_rate = if vat_rate.is_sign_negative() && !vat_rate.is_zero() {
            warn!(quote = %self.quote_number, %vat_rate, "negative VAT rate clamped to zero");
            Decimal::ZERO
        } else {
            vat_rate
        };
        self.recalculate();
        self
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn vat_rate(&self) -> Decimal {
        self.vat_rate
    }

    pub fn totals(&self) -> &QuoteTotals {
        &self.totals
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Applies `f` to the line items and re-derives totals afterwards.
    pub(crate) fn edit_line_items(
        &mut self,
        f: impl FnOnce(&mut Vec<LineItem>),
    ) {
        f(&mut self.line_items);
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.totals = calculate_totals(&self.line_items, self.vat_rate);
    }
}
