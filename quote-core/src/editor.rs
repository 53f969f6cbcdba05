//! Editing operations on a [`Quote`].
//!
//! Every function here takes the current quote by reference and returns the
//! edited copy, with totals already re-derived. The input is never touched,
//! so a caller can keep the previous value around (e.g. for undo) or drop
//! the result if a later step fails.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input::parse_decimal_or_zero;
use crate::models::{
    BankingInfo, ClientInfo, DisplaySettings, LineItem, LineItemId, Quote, VehicleInfo,
};

/// Editable columns of a line item. `total` is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemField {
    Code,
    Description,
    Quantity,
    UnitPrice,
}

impl LineItemField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(Self::Code),
            "description" => Some(Self::Description),
            "quantity" | "qty" => Some(Self::Quantity),
            "unit_price" | "price" => Some(Self::UnitPrice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Appends a blank line item with a fresh id.
pub fn add_line_item(quote: &Quote) -> Quote {
    let (quote, _) = add_line_item_with_id(quote, LineItemId::generate());
    quote
}

/// Appends a blank line item with the given id and returns it alongside
/// the new quote.
pub fn add_line_item_with_id(
    quote: &Quote,
    id: LineItemId,
) -> (Quote, LineItemId) {
    let mut next = quote.clone();
    next.edit_line_items(|items| items.push(LineItem::new(id.clone())));
    debug!(quote = %quote.quote_number, item = %id, "line item added");
    (next, id)
}

/// Appends an already populated line item, e.g. one read from an import.
pub fn append_line_item(
    quote: &Quote,
    item: LineItem,
) -> Quote {
    let mut next = quote.clone();
    let id = item.id.clone();
    next.edit_line_items(|items| items.push(item));
    debug!(quote = %quote.quote_number, item = %id, "line item appended");
    next
}

/// Removes the line item with `id`. Unknown ids leave the items unchanged.
pub fn remove_line_item(
    quote: &Quote,
    id: &LineItemId,
) -> Quote {
    let mut next = quote.clone();
    next.edit_line_items(|items| items.retain(|item| &item.id != id));
    debug!(quote = %quote.quote_number, item = %id, "line item removed");
    next
}

/// Sets one field of the line item with `id` from user text.
///
/// Numeric fields fall back to zero when `value` does not parse. An empty
/// code clears it.
pub fn edit_line_item(
    quote: &Quote,
    id: &LineItemId,
    field: LineItemField,
    value: &str,
) -> Quote {
    let mut next = quote.clone();
    next.edit_line_items(|items| {
        let Some(item) = items.iter_mut().find(|item| &item.id == id) else {
            return;
        };
        match field {
            LineItemField::Code => {
                let code = value.trim();
                item.code = (!code.is_empty()).then(|| code.to_string());
            }
            LineItemField::Description => item.description = value.to_string(),
            LineItemField::Quantity => item.set_quantity(parse_decimal_or_zero(value)),
            LineItemField::UnitPrice => item.set_unit_price(parse_decimal_or_zero(value)),
        }
    });
    next
}

/// Swaps the line item with `id` and its neighbour in `direction`.
///
/// Moving the first row up or the last row down is a no-op.
pub fn move_line_item(
    quote: &Quote,
    id: &LineItemId,
    direction: Direction,
) -> Quote {
    let mut next = quote.clone();
    next.edit_line_items(|items| {
        let Some(index) = items.iter().position(|item| &item.id == id) else {
            return;
        };
        let neighbour = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < items.len()),
        };
        if let Some(neighbour) = neighbour {
            items.swap(index, neighbour);
        }
    });
    next
}

/// Sets the VAT percentage used for the totals.
pub fn set_vat_rate(
    quote: &Quote,
    vat_rate: Decimal,
) -> Quote {
    quote.clone().with_vat_rate(vat_rate)
}

pub fn set_notes(
    quote: &Quote,
    notes: impl Into<String>,
) -> Quote {
    let mut next = quote.clone();
    next.notes = notes.into();
    next
}

/// Sets the quote date and/or expiry date.
pub fn set_dates(
    quote: &Quote,
    quote_date: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
) -> Quote {
    let mut next = quote.clone();
    if let Some(date) = quote_date {
        next.quote_date = date;
    }
    if let Some(date) = valid_until {
        next.valid_until = date;
    }
    next
}

/// Partial update of [`ClientInfo`]; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ClientPatch {
    fn apply(
        self,
        client: &mut ClientInfo,
    ) {
        patch(&mut client.name, self.name);
        patch(&mut client.address, self.address);
        patch(&mut client.phone, self.phone);
        patch(&mut client.email, self.email);
    }
}

/// Partial update of [`VehicleInfo`]; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePatch {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub registration: Option<String>,
    pub vin: Option<String>,
    pub mileage: Option<String>,
}

impl VehiclePatch {
    fn apply(
        self,
        vehicle: &mut VehicleInfo,
    ) {
        patch(&mut vehicle.make, self.make);
        patch(&mut vehicle.model, self.model);
        patch(&mut vehicle.year, self.year);
        patch(&mut vehicle.registration, self.registration);
        patch(&mut vehicle.vin, self.vin);
        patch(&mut vehicle.mileage, self.mileage);
    }
}

/// Partial update of [`BankingInfo`]; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankingPatch {
    pub bank_name: Option<String>,
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub branch_code: Option<String>,
}

impl BankingPatch {
    fn apply(
        self,
        banking: &mut BankingInfo,
    ) {
        patch(&mut banking.bank_name, self.bank_name);
        patch(&mut banking.account_holder, self.account_holder);
        patch(&mut banking.account_number, self.account_number);
        patch(&mut banking.branch_code, self.branch_code);
    }
}

fn patch(
    target: &mut String,
    value: Option<String>,
) {
    if let Some(value) = value {
        *target = value;
    }
}

pub fn update_client(
    quote: &Quote,
    patch: ClientPatch,
) -> Quote {
    let mut next = quote.clone();
    patch.apply(&mut next.client);
    next
}

pub fn update_vehicle(
    quote: &Quote,
    patch: VehiclePatch,
) -> Quote {
    let mut next = quote.clone();
    patch.apply(&mut next.vehicle);
    next
}

pub fn update_banking(
    quote: &Quote,
    patch: BankingPatch,
) -> Quote {
    let mut next = quote.clone();
    patch.apply(&mut next.banking);
    next
}

pub fn update_settings(
    quote: &Quote,
    settings: DisplaySettings,
) -> Quote {
    let mut next = quote.clone();
    next.settings = settings;
    next
}
