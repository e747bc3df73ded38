use std::path::Path;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use crate::ClientResult;
use crate::contracts::types::InvoiceItem;
use crate::ingest::store::canonical_amount;
use crate::setup::{SetupContext, ensure_initialized, ensure_initialized_at};
use crate::state::map_sqlite_error;

pub(crate) fn load_setup(home_override: Option<&Path>) -> ClientResult<SetupContext> {
    if let Some(path) = home_override {
        return ensure_initialized_at(path);
    }
    ensure_initialized()
}

/// The local calendar day unless the caller pins one.
pub(crate) fn resolve_today(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn query_invoices(
    connection: &Connection,
    db_path: &Path,
    overdue_only: bool,
    today: NaiveDate,
) -> ClientResult<Vec<InvoiceItem>> {
    let mut statement = connection
        .prepare(
            "SELECT
                invoice_id,
                upload_id,
                customer,
                due_date,
                description,
                original_amount,
                salesperson,
                origin,
                created_at
             FROM internal_invoices
             WHERE (?1 = 0 OR due_date < ?2)
             ORDER BY due_date ASC, customer ASC, invoice_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(params![overdue_only, format_day(today)], |row| {
            let due_date: String = row.get(3)?;
            Ok(InvoiceItem {
                invoice_id: row.get(0)?,
                upload_id: row.get(1)?,
                customer: row.get(2)?,
                days_overdue: days_overdue(&due_date, today),
                due_date,
                description: row.get(4)?,
                original_amount: row.get(5)?,
                salesperson: row.get(6)?,
                origin: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

/// Zero for invoices not yet due or with an unreadable stored date.
pub(crate) fn days_overdue(due_date: &str, today: NaiveDate) -> i64 {
    NaiveDate::parse_from_str(due_date, "%Y-%m-%d")
        .map(|due| (today - due).num_days().max(0))
        .unwrap_or(0)
}

pub(crate) fn sum_amounts(rows: &[InvoiceItem]) -> String {
    let total = rows
        .iter()
        .filter_map(|row| Decimal::from_str(&row.original_amount).ok())
        .fold(Decimal::ZERO, |total, amount| total + amount);
    canonical_amount(total)
}
