use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::ClientResult;
use crate::ingest::origin::Origin;
use crate::ingest::validate::ValidInvoice;
use crate::state::map_sqlite_error;

/// Exact-match identity of an invoice. The amount is kept in canonical text
/// so `500`, `500.0` and `500.00` land on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DedupeKey {
    pub(crate) customer: String,
    pub(crate) due_date: String,
    pub(crate) original_amount: String,
    pub(crate) description: String,
    pub(crate) origin: Origin,
}

impl DedupeKey {
    pub(crate) fn of(invoice: &ValidInvoice) -> Self {
        Self {
            customer: invoice.customer.clone(),
            due_date: invoice.due_date.format("%Y-%m-%d").to_string(),
            original_amount: canonical_amount(invoice.original_amount),
            description: invoice.description.clone(),
            origin: invoice.origin,
        }
    }
}

/// Two-decimal minimum, trailing zeros beyond that dropped.
pub(crate) fn canonical_amount(amount: Decimal) -> String {
    let mut value = amount.normalize();
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredInvoice {
    pub(crate) invoice_id: String,
    pub(crate) upload_id: String,
    pub(crate) created_at: String,
}

pub(crate) trait InvoiceStore {
    fn find_existing(&self, key: &DedupeKey) -> ClientResult<Option<StoredInvoice>>;

    fn persist(&mut self, invoice: &ValidInvoice) -> ClientResult<StoredInvoice>;
}

/// Writes through whatever transaction owns `connection`; commit and
/// rollback stay with the caller.
pub(crate) struct SqliteInvoiceStore<'a> {
    connection: &'a Connection,
    db_path: &'a Path,
    upload_id: &'a str,
    created_at: String,
}

impl<'a> SqliteInvoiceStore<'a> {
    pub(crate) fn new(connection: &'a Connection, db_path: &'a Path, upload_id: &'a str) -> Self {
        Self {
            connection,
            db_path,
            upload_id,
            created_at: now_timestamp(),
        }
    }
}

impl InvoiceStore for SqliteInvoiceStore<'_> {
    fn find_existing(&self, key: &DedupeKey) -> ClientResult<Option<StoredInvoice>> {
        self.connection
            .query_row(
                "SELECT invoice_id, upload_id, created_at
                 FROM internal_invoices
                 WHERE customer = ?1
                   AND due_date = ?2
                   AND original_amount = ?3
                   AND description = ?4
                   AND origin = ?5
                 ORDER BY invoice_id ASC
                 LIMIT 1",
                params![
                    &key.customer,
                    &key.due_date,
                    &key.original_amount,
                    &key.description,
                    key.origin.as_str()
                ],
                |row| {
                    Ok(StoredInvoice {
                        invoice_id: row.get(0)?,
                        upload_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn persist(&mut self, invoice: &ValidInvoice) -> ClientResult<StoredInvoice> {
        let key = DedupeKey::of(invoice);
        let invoice_id = format!("inv_{}", Ulid::new());
        self.connection
            .execute(
                "INSERT INTO internal_invoices (
                    invoice_id,
                    upload_id,
                    customer,
                    due_date,
                    description,
                    original_amount,
                    salesperson,
                    origin,
                    created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    &invoice_id,
                    self.upload_id,
                    &key.customer,
                    &key.due_date,
                    &key.description,
                    &key.original_amount,
                    &invoice.salesperson,
                    key.origin.as_str(),
                    &self.created_at
                ],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(StoredInvoice {
            invoice_id,
            upload_id: self.upload_id.to_string(),
            created_at: self.created_at.clone(),
        })
    }
}

pub(crate) fn now_timestamp() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH);
    match now {
        Ok(duration) => format!("{}", duration.as_secs()),
        Err(_) => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::canonical_amount;

    #[test]
    fn equal_amounts_share_one_canonical_text() {
        assert_eq!(canonical_amount(Decimal::from(500)), "500.00");
        assert_eq!(canonical_amount(Decimal::new(5000, 1)), "500.00");
        assert_eq!(canonical_amount(Decimal::new(50000, 2)), "500.00");
        assert_eq!(canonical_amount(Decimal::new(123450, 2)), "1234.50");
        assert_eq!(canonical_amount(Decimal::new(10125, 3)), "10.125");
        assert_eq!(canonical_amount(Decimal::new(101250, 4)), "10.125");
    }
}
