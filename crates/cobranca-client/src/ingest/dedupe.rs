use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ingest::store::{DedupeKey, InvoiceStore, StoredInvoice};
use crate::ingest::validate::ValidInvoice;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum DedupeReason {
    Batch,
    ExistingLedger,
}

impl DedupeReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::ExistingLedger => "existing_ledger",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DuplicateRecord {
    pub(crate) invoice: ValidInvoice,
    pub(crate) key: DedupeKey,
    pub(crate) dedupe_reason: DedupeReason,
    pub(crate) matched_row: Option<i64>,
    pub(crate) matched: Option<StoredInvoice>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct IngestOutcome {
    pub(crate) inserted: Vec<StoredInvoice>,
    pub(crate) duplicates: Vec<DuplicateRecord>,
}

impl IngestOutcome {
    pub(crate) fn count_reason(&self, reason: DedupeReason) -> i64 {
        self.duplicates
            .iter()
            .filter(|duplicate| duplicate.dedupe_reason == reason)
            .count() as i64
    }
}

/// Offers each row to storage in input order. A key already written by an
/// earlier row of this batch is skipped without asking storage. The first
/// storage error stops the batch; the caller discards the transaction.
pub(crate) fn ingest_rows<S: InvoiceStore>(
    store: &mut S,
    rows: Vec<ValidInvoice>,
) -> ClientResult<IngestOutcome> {
    let mut seen: HashMap<DedupeKey, (i64, StoredInvoice)> = HashMap::new();
    let mut outcome = IngestOutcome::default();

    for invoice in rows {
        let key = DedupeKey::of(&invoice);

        if let Some((matched_row, matched)) = seen.get(&key) {
            debug!(row = invoice.row, matched_row, "skipping duplicate row within upload");
            outcome.duplicates.push(DuplicateRecord {
                dedupe_reason: DedupeReason::Batch,
                matched_row: Some(*matched_row),
                matched: Some(matched.clone()),
                invoice,
                key,
            });
            continue;
        }

        let existing = store
            .find_existing(&key)
            .map_err(|error| abort(&error, invoice.row))?;
        if let Some(matched) = existing {
            debug!(
                row = invoice.row,
                invoice_id = %matched.invoice_id,
                ingested_at = %matched.created_at,
                "skipping row already in ledger"
            );
            outcome.duplicates.push(DuplicateRecord {
                dedupe_reason: DedupeReason::ExistingLedger,
                matched_row: None,
                matched: Some(matched),
                invoice,
                key,
            });
            continue;
        }

        let stored = store
            .persist(&invoice)
            .map_err(|error| abort(&error, invoice.row))?;
        seen.insert(key, (invoice.row, stored.clone()));
        outcome.inserted.push(stored);
    }

    Ok(outcome)
}

/// Wraps a storage error as `ingestion_failed`; the caller's transaction rolls back on drop.
pub(crate) fn abort(error: &ClientError, row: i64) -> ClientError {
    warn!(row, code = %error.code, "storage failure, abandoning upload");
    ClientError::ingestion_failed(&error.message, row, &error.code)
}
