mod invoice;
mod line_item;
mod quote;
pub mod quote_number;
mod quote_status;

pub use invoice::Invoice;
pub use line_item::{LineItem, LineItemId, MAX_LINE_VALUE};
pub use quote::{
    BankingInfo, ClientInfo, DEFAULT_VALIDITY_DAYS, DEFAULT_VAT_RATE, DisplaySettings, Quote,
    VehicleInfo,
};
pub use quote_status::QuoteStatus;
