use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Opaque identifier of a line item within its quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(String);

impl LineItemId {
    /// Generates a fresh, unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LineItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for LineItemId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Largest quantity or unit price a row accepts (one trillion). Larger
/// values are capped so that `quantity * unit_price` always fits a
/// [`Decimal`].
pub const MAX_LINE_VALUE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// One billable row of a quote.
///
/// `quantity` and `unit_price` are only reachable through setters so that
/// `total` can never drift from `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub code: Option<String>,
    pub description: String,
    quantity: Decimal,
    unit_price: Decimal,
    total: Decimal,
}

impl LineItem {
    /// A blank row: no description, zero quantity and price.
    pub fn new(id: LineItemId) -> Self {
        Self {
            id,
            code: None,
            description: String::new(),
            quantity: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Builds a fully populated row, e.g. when restoring from storage.
    pub fn with_values(
        id: LineItemId,
        code: Option<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        let mut item = Self::new(id);
        item.code = code;
        item.description = description.into();
        item.set_quantity(quantity);
        item.set_unit_price(unit_price);
        item
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Always `quantity * unit_price`.
    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn set_quantity(
        &mut self,
        quantity: Decimal,
    ) {
        self.quantity = bounded("quantity", quantity);
        self.recompute();
    }

    pub fn set_unit_price(
        &mut self,
        unit_price: Decimal,
    ) {
        self.unit_price = bounded("unit_price", unit_price);
        self.recompute();
    }

    /// True when the row may appear on a finalized quote.
    pub fn is_complete(&self) -> bool {
        !self.description.trim().is_empty() && self.unit_price > Decimal::ZERO
    }

    fn recompute(&mut self) {
        self.total = self.quantity.saturating_mul(self.unit_price);
    }
}

/// Clamps `value` into `0..=MAX_LINE_VALUE`.
fn bounded(
    field: &'static str,
    value: Decimal,
) -> Decimal {
    if value.is_sign_negative() && !value.is_zero() {
        warn!(field, %value, "negative line item value clamped to zero");
        Decimal::ZERO
    } else if value > MAX_LINE_VALUE {
        warn!(field, %value, max = %MAX_LINE_VALUE, "line item value capped");
        MAX_LINE_VALUE
    } else {
        value
    }
}
