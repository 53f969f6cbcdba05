use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record created when a quote is converted to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub quote_id: i64,
    pub invoice_number: String,
    pub issued_at: DateTime<Utc>,
}
