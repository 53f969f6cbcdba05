use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quote_core::models::quote_number::{
    format_invoice_number, invoice_number_prefix, parse_document_number, quote_number_prefix,
};
use quote_core::{
    BankingInfo, ClientInfo, DisplaySettings, Invoice, LineItem, LineItemId, Quote,
    QuoteRepository, QuoteStatus, RepositoryError, VehicleInfo,
};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, query::Query};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

/// Quote columns written on both insert and update, in bind order.
const HEADER_COLUMNS: [&str; 30] = [
    "quote_number",
    "quote_date",
    "valid_until",
    "status",
    "client_name",
    "client_address",
    "client_phone",
    "client_email",
    "vehicle_make",
    "vehicle_model",
    "vehicle_year",
    "vehicle_registration",
    "vehicle_vin",
    "vehicle_mileage",
    "bank_name",
    "bank_account_holder",
    "bank_account_number",
    "bank_branch_code",
    "primary_color",
    "accent_color",
    "font_family",
    "show_vehicle",
    "show_banking",
    "show_item_codes",
    "show_notes",
    "notes",
    "vat_rate",
    "subtotal",
    "tax",
    "total",
];

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`.
    ///
    /// Accepts `sqlite:` URLs, `:memory:`, or a bare file path which is
    /// created if missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = connect_options(database_url)?;
        let in_memory = database_url.contains(":memory:");

        // Every connection to an in-memory database sees its own copy, so
        // keep the pool to one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_line_items(
        &self,
        quote_id: i64,
    ) -> Result<Vec<LineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT item_id, code, description, quantity, unit_price
             FROM quote_line_items WHERE quote_id = ? ORDER BY position",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_line_item).collect()
    }

    async fn load_quote(
        &self,
        row: &SqliteRow,
    ) -> Result<Quote, RepositoryError> {
        let id: i64 = row.try_get("id").map_err(db_error)?;
        let items = self.load_line_items(id).await?;
        row_to_quote(row, items)
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions> {
    let options = if database_url == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid SQLite URL: {}", database_url))?
    } else {
        SqliteConnectOptions::new().filename(database_url)
    };
    Ok(options.create_if_missing(true).foreign_keys(true))
}

/// Highest sequence among `numbers` issued for `date`. Sequences are
/// compared numerically because they grow past three digits.
fn highest_sequence(
    numbers: &[String],
    date: NaiveDate,
    invoices: bool,
) -> u32 {
    numbers
        .iter()
        .filter_map(|number| parse_document_number(number))
        .filter(|parsed| parsed.date == date && parsed.is_invoice == invoices)
        .map(|parsed| parsed.seq)
        .max()
        .unwrap_or(0)
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn select_quotes_sql(filter: &str) -> String {
    format!(
        "SELECT id, {}, created_at, updated_at FROM quotes {filter}",
        HEADER_COLUMNS.join(", ")
    )
}

fn bind_header<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    quote: &'q Quote,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let totals = quote.totals();
    query
        .bind(&quote.quote_number)
        .bind(quote.quote_date)
        .bind(quote.valid_until)
        .bind(quote.status.as_str())
        .bind(&quote.client.name)
        .bind(&quote.client.address)
        .bind(&quote.client.phone)
        .bind(&quote.client.email)
        .bind(&quote.vehicle.make)
        .bind(&quote.vehicle.model)
        .bind(&quote.vehicle.year)
        .bind(&quote.vehicle.registration)
        .bind(&quote.vehicle.vin)
        .bind(&quote.vehicle.mileage)
        .bind(&quote.banking.bank_name)
        .bind(&quote.banking.account_holder)
        .bind(&quote.banking.account_number)
        .bind(&quote.banking.branch_code)
        .bind(&quote.settings.primary_color)
        .bind(&quote.settings.accent_color)
        .bind(&quote.settings.font_family)
        .bind(quote.settings.show_vehicle)
        .bind(quote.settings.show_banking)
        .bind(quote.settings.show_item_codes)
        .bind(quote.settings.show_notes)
        .bind(&quote.notes)
        .bind(decimal_to_text(quote.vat_rate()))
        .bind(decimal_to_text(totals.subtotal))
        .bind(decimal_to_text(totals.tax))
        .bind(decimal_to_text(totals.total))
}

fn get_string(
    row: &SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(db_error)
}

fn get_bool(
    row: &SqliteRow,
    column: &str,
) -> Result<bool, RepositoryError> {
    row.try_get(column).map_err(db_error)
}

fn row_to_line_item(row: &SqliteRow) -> Result<LineItem, RepositoryError> {
    let item_id: String = get_string(row, "item_id")?;
    let code: Option<String> = row.try_get("code").map_err(db_error)?;
    Ok(LineItem::with_values(
        LineItemId::from(item_id),
        code,
        get_string(row, "description")?,
        get_decimal(row, "quantity")?,
        get_decimal(row, "unit_price")?,
    ))
}

fn row_to_quote(
    row: &SqliteRow,
    line_items: Vec<LineItem>,
) -> Result<Quote, RepositoryError> {
    let status_str = get_string(row, "status")?;
    let status = QuoteStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid quote status: {}", status_str)))?;
    let quote_date: NaiveDate = row.try_get("quote_date").map_err(db_error)?;

    let mut quote = Quote::new_draft(get_string(row, "quote_number")?, quote_date)
        .with_vat_rate(get_decimal(row, "vat_rate")?)
        .with_line_items(line_items);

    quote.id = Some(row.try_get("id").map_err(db_error)?);
    quote.valid_until = row.try_get("valid_until").map_err(db_error)?;
    quote.status = status;
    quote.client = ClientInfo {
        name: get_string(row, "client_name")?,
        address: get_string(row, "client_address")?,
        phone: get_string(row, "client_phone")?,
        email: get_string(row, "client_email")?,
    };
    quote.vehicle = VehicleInfo {
        make: get_string(row, "vehicle_make")?,
        model: get_string(row, "vehicle_model")?,
        year: get_string(row, "vehicle_year")?,
        registration: get_string(row, "vehicle_registration")?,
        vin: get_string(row, "vehicle_vin")?,
        mileage: get_string(row, "vehicle_mileage")?,
    };
    quote.banking = BankingInfo {
        bank_name: get_string(row, "bank_name")?,
        account_holder: get_string(row, "bank_account_holder")?,
        account_number: get_string(row, "bank_account_number")?,
        branch_code: get_string(row, "bank_branch_code")?,
    };
    quote.settings = DisplaySettings {
        primary_color: get_string(row, "primary_color")?,
        accent_color: get_string(row, "accent_color")?,
        font_family: get_string(row, "font_family")?,
        show_vehicle: get_bool(row, "show_vehicle")?,
        show_banking: get_bool(row, "show_banking")?,
        show_item_codes: get_bool(row, "show_item_codes")?,
        show_notes: get_bool(row, "show_notes")?,
    };
    quote.notes = get_string(row, "notes")?;
    quote.created_at = Some(
        row.try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    );
    quote.updated_at = Some(
        row.try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    );

    Ok(quote)
}

#[async_trait]
impl QuoteRepository for SqliteRepository {
    async fn save_quote(
        &self,
        quote: &Quote,
    ) -> Result<i64, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let id = match quote.id {
            None => {
                let sql = format!(
                    "INSERT INTO quotes ({}, created_at, updated_at) VALUES ({})",
                    HEADER_COLUMNS.join(", "),
                    vec!["?"; HEADER_COLUMNS.len() + 2].join(", ")
                );
                let result = bind_header(sqlx::query(&sql), quote)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
                result.last_insert_rowid()
            }
            Some(id) => {
                let assignments: Vec<String> =
                    HEADER_COLUMNS.iter().map(|c| format!("{c} = ?")).collect();
                let sql = format!(
                    "UPDATE quotes SET {}, updated_at = ? WHERE id = ?",
                    assignments.join(", ")
                );
                let result = bind_header(sqlx::query(&sql), quote)
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }
                id
            }
        };

        sqlx::query("DELETE FROM quote_line_items WHERE quote_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (position, item) in quote.line_items().iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_line_items (
                    quote_id, position, item_id, code, description, quantity, unit_price
                ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(item.id.as_str())
            .bind(item.code.as_deref())
            .bind(&item.description)
            .bind(decimal_to_text(item.quantity()))
            .bind(decimal_to_text(item.unit_price()))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(id, items = quote.line_items().len(), "quote written");

        Ok(id)
    }

    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<Quote, RepositoryError> {
        let row = sqlx::query(&select_quotes_sql("WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        self.load_quote(&row).await
    }

    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for sql in [
            "DELETE FROM quote_line_items WHERE quote_id = ?",
            "DELETE FROM invoices WHERE quote_id = ?",
        ] {
            sqlx::query(sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&select_quotes_sql(
                    "WHERE status = ? ORDER BY updated_at DESC, id DESC",
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&select_quotes_sql("ORDER BY updated_at DESC, id DESC"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_error)?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in &rows {
            quotes.push(self.load_quote(row).await?);
        }
        Ok(quotes)
    }

    async fn last_quote_sequence_on(
        &self,
        date: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        let numbers: Vec<String> =
            sqlx::query_scalar("SELECT quote_number FROM quotes WHERE quote_number LIKE ?")
                .bind(format!("{}%", quote_number_prefix(date)))
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(highest_sequence(&numbers, date, false))
    }

    async fn convert_to_invoice(
        &self,
        quote_id: i64,
    ) -> Result<i64, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM invoices WHERE quote_id = ?")
            .bind(quote_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if let Some(invoice_id) = existing {
            return Ok(invoice_id);
        }

        let updated = sqlx::query("UPDATE quotes SET status = ?, updated_at = ? WHERE id = ?")
            .bind(QuoteStatus::Invoice.as_str())
            .bind(now)
            .bind(quote_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let today = now.date_naive();
        let issued_today: Vec<String> =
            sqlx::query_scalar("SELECT invoice_number FROM invoices WHERE invoice_number LIKE ?")
                .bind(format!("{}%", invoice_number_prefix(today)))
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error)?;
        let seq = highest_sequence(&issued_today, today, true) + 1;

        let result = sqlx::query(
            "INSERT INTO invoices (quote_id, invoice_number, issued_at) VALUES (?, ?, ?)",
        )
        .bind(quote_id)
        .bind(format_invoice_number(today, seq))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(result.last_insert_rowid())
    }

    async fn get_invoice(
        &self,
        id: i64,
    ) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, quote_id, invoice_number, issued_at FROM invoices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Invoice {
            id: row.try_get("id").map_err(db_error)?,
            quote_id: row.try_get("quote_id").map_err(db_error)?,
            invoice_number: get_string(&row, "invoice_number")?,
            issued_at: row
                .try_get::<DateTime<Utc>, _>("issued_at")
                .map_err(|e| RepositoryError::Database(format!("Failed to get issued_at: {}", e)))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quote_core::editor::{ClientPatch, Direction, move_line_item, update_client};
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let repo = SqliteRepository::new(":memory:")
            .await
            .expect("Failed to create in-memory database");
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn create_test_quote(number: &str) -> Quote {
        let quote = Quote::new_draft(number, date()).with_line_items(vec![
            LineItem::with_values("a".into(), Some("BRK-01".into()), "Brake pads", dec!(2), dec!(100)),
            LineItem::with_values("b".into(), None, "Labour", dec!(1.5), dec!(33.33)),
        ]);
        let mut quote = update_client(
            &quote,
            ClientPatch {
                name: Some("Acme Fleet".into()),
                address: Some("1 Depot Rd".into()),
                email: Some("fleet@acme.test".into()),
                ..Default::default()
            },
        );
        quote.vehicle.registration = "CA 123-456".into();
        quote.banking.bank_name = "First Bank".into();
        quote.settings.show_banking = false;
        quote.notes = "Parts on order".into();
        quote
    }

    #[tokio::test]
    async fn test_save_and_get_quote() {
        let repo = setup_test_db().await;
        let quote = create_test_quote("Q010625001");

        let id = repo.save_quote(&quote).await.expect("Failed to save quote");
        let loaded = repo.get_quote(id).await.expect("Failed to load quote");

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.quote_number, "Q010625001");
        assert_eq!(loaded.quote_date, date());
        assert_eq!(loaded.valid_until, quote.valid_until);
        assert_eq!(loaded.status, QuoteStatus::Draft);
        assert_eq!(loaded.client, quote.client);
        assert_eq!(loaded.vehicle, quote.vehicle);
        assert_eq!(loaded.banking, quote.banking);
        assert_eq!(loaded.settings, quote.settings);
        assert_eq!(loaded.notes, quote.notes);
        assert_eq!(loaded.line_items(), quote.line_items());
        assert_eq!(loaded.totals(), quote.totals());
        assert!(loaded.created_at.is_some());
    }

    #[tokio::test]
    async fn test_decimals_survive_exactly() {
        let repo = setup_test_db().await;
        let quote = create_test_quote("Q010625001");

        let id = repo.save_quote(&quote).await.unwrap();
        let loaded = repo.get_quote(id).await.unwrap();

        assert_eq!(loaded.line_items()[1].total(), dec!(49.995));
        assert_eq!(loaded.totals().subtotal, dec!(249.995));
    }

    #[tokio::test]
    async fn test_update_rewrites_line_item_order() {
        let repo = setup_test_db().await;
        let id = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        let stored = repo.get_quote(id).await.unwrap();

        let reordered = move_line_item(&stored, &"b".into(), Direction::Up);
        let same_id = repo.save_quote(&reordered).await.unwrap();
        let loaded = repo.get_quote(id).await.unwrap();

        assert_eq!(same_id, id);
        let ids: Vec<_> = loaded.line_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_update_missing_quote_is_not_found() {
        let repo = setup_test_db().await;
        let mut quote = create_test_quote("Q010625001");
        quote.id = Some(999);

        let result = repo.save_quote(&quote).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_get_quote_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_quote(999).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_duplicate_quote_number_is_database_error() {
        let repo = setup_test_db().await;
        repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();

        let result = repo.save_quote(&create_test_quote("Q010625001")).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_quote_removes_items() {
        let repo = setup_test_db().await;
        let id = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();

        repo.delete_quote(id).await.expect("Failed to delete quote");

        assert_eq!(repo.get_quote(id).await, Err(RepositoryError::NotFound));
        let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quote_line_items")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[tokio::test]
    async fn test_delete_quote_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.delete_quote(999).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_quotes_filters_by_status() {
        let repo = setup_test_db().await;
        repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        let mut pending = create_test_quote("Q010625002");
        pending.status = QuoteStatus::Pending;
        repo.save_quote(&pending).await.unwrap();

        let all = repo.list_quotes(None).await.unwrap();
        let only_pending = repo.list_quotes(Some(QuoteStatus::Pending)).await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(only_pending.len(), 1);
        assert_eq!(only_pending[0].quote_number, "Q010625002");
        assert_eq!(only_pending[0].line_items().len(), 2);
    }

    #[tokio::test]
    async fn test_last_quote_sequence_on_date() {
        let repo = setup_test_db().await;
        repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        repo.save_quote(&create_test_quote("Q010625002")).await.unwrap();

        let today = repo.last_quote_sequence_on(date()).await.unwrap();
        let other_day = repo
            .last_quote_sequence_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
            .await
            .unwrap();

        assert_eq!(today, 2);
        assert_eq!(other_day, 0);
    }

    #[tokio::test]
    async fn test_last_quote_sequence_is_numeric_max_after_delete() {
        let repo = setup_test_db().await;
        let first = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        repo.save_quote(&create_test_quote("Q010625002")).await.unwrap();
        repo.save_quote(&create_test_quote("Q0106251000")).await.unwrap();

        repo.delete_quote(first).await.unwrap();

        assert_eq!(repo.last_quote_sequence_on(date()).await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_convert_to_invoice() {
        let repo = setup_test_db().await;
        let id = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();

        let invoice_id = repo.convert_to_invoice(id).await.expect("Failed to convert");
        let invoice = repo.get_invoice(invoice_id).await.expect("Failed to load invoice");
        let quote = repo.get_quote(id).await.unwrap();

        assert_eq!(quote.status, QuoteStatus::Invoice);
        assert_eq!(invoice.quote_id, id);
        assert!(invoice.invoice_number.starts_with("INV"));
        assert!(invoice.invoice_number.ends_with("001"));
    }

    #[tokio::test]
    async fn test_convert_twice_returns_same_invoice() {
        let repo = setup_test_db().await;
        let id = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();

        let first = repo.convert_to_invoice(id).await.unwrap();
        let second = repo.convert_to_invoice(id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invoice_numbers_increment() {
        let repo = setup_test_db().await;
        let first_quote = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        let second_quote = repo.save_quote(&create_test_quote("Q010625002")).await.unwrap();

        let first = repo.convert_to_invoice(first_quote).await.unwrap();
        let second = repo.convert_to_invoice(second_quote).await.unwrap();

        let first = repo.get_invoice(first).await.unwrap();
        let second = repo.get_invoice(second).await.unwrap();
        assert!(first.invoice_number.ends_with("001"));
        assert!(second.invoice_number.ends_with("002"));
    }

    #[tokio::test]
    async fn test_invoice_number_not_reused_after_delete() {
        let repo = setup_test_db().await;
        let first_quote = repo.save_quote(&create_test_quote("Q010625001")).await.unwrap();
        let second_quote = repo.save_quote(&create_test_quote("Q010625002")).await.unwrap();
        let third_quote = repo.save_quote(&create_test_quote("Q010625003")).await.unwrap();
        repo.convert_to_invoice(first_quote).await.unwrap();
        let second = repo.convert_to_invoice(second_quote).await.unwrap();

        repo.delete_quote(first_quote).await.unwrap();
        let third = repo
            .convert_to_invoice(third_quote)
            .await
            .expect("conversion after delete should pick a fresh number");

        let second = repo.get_invoice(second).await.unwrap();
        let third = repo.get_invoice(third).await.unwrap();
        assert!(second.invoice_number.ends_with("002"));
        assert!(third.invoice_number.ends_with("003"));
    }

    #[tokio::test]
    async fn test_convert_missing_quote_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.convert_to_invoice(42).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_get_invoice_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_invoice(42).await, Err(RepositoryError::NotFound));
    }
}
