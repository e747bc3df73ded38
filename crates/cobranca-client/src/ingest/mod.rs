pub(crate) mod columns;
pub(crate) mod dedupe;
pub(crate) mod normalize;
pub mod origin;
pub(crate) mod store;
pub(crate) mod table;
pub(crate) mod validate;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::{debug, info};
use ulid::Ulid;

use crate::ClientResult;
use crate::contracts::types::{
    UploadDuplicateRow, UploadDuplicateSummary, UploadDuplicatesPreview, UploadIssue,
    UploadSummary,
};
use crate::ingest::dedupe::{DedupeReason, DuplicateRecord};
use crate::ingest::origin::{Origin, adapter_for, read_candidates};
use crate::ingest::store::{SqliteInvoiceStore, now_timestamp};
use crate::ingest::validate::{ValidInvoice, Verdict};
use crate::state::map_sqlite_error;

const PREVIEW_LIMIT: usize = 50;

pub(crate) struct UploadRequest<'a> {
    pub(crate) origin: Origin,
    pub(crate) content: &'a [u8],
    pub(crate) source_ref: Option<&'a str>,
    pub(crate) today: NaiveDate,
}

#[derive(Debug, Clone)]
pub(crate) struct UploadExecutionResult {
    pub(crate) upload_id: String,
    pub(crate) summary: UploadSummary,
    pub(crate) duplicate_summary: UploadDuplicateSummary,
    pub(crate) duplicates_preview: UploadDuplicatesPreview,
    pub(crate) issues: Vec<UploadIssue>,
    pub(crate) issues_truncated: bool,
}

/// Runs one upload end to end: parse, resolve, normalize, validate, then
/// dedupe and persist inside a single immediate transaction. Either every
/// accepted row is committed together with its upload run, or nothing is.
pub(crate) fn execute(
    connection: &mut Connection,
    db_path: &Path,
    request: UploadRequest<'_>,
) -> ClientResult<UploadExecutionResult> {
    let adapter = adapter_for(request.origin);
    info!(origin = %request.origin, bytes = request.content.len(), "upload started");

    let adapted = read_candidates(&adapter, request.content)?;
    debug!(headers = ?adapted.headers, rows = adapted.candidates.len(), "columns resolved");

    let rows_read = adapted.candidates.len() as i64;
    let last_row = adapted.candidates.last().map_or(0, |candidate| candidate.row);
    let mut accepted: Vec<ValidInvoice> = Vec::new();
    let mut issues: Vec<UploadIssue> = Vec::new();
    let mut skipped_invalid = 0_i64;
    let mut rows_malformed = 0_i64;

    for candidate in adapted.candidates {
        let verdict = validate::check(candidate, request.today);
        if verdict.is_malformed() {
            rows_malformed += 1;
        }
        match verdict {
            Verdict::Accept(invoice) => accepted.push(invoice),
            Verdict::Reject(row_issues) => {
                if let Some(first) = row_issues.first() {
                    debug!(row = first.row, code = %first.code, "row rejected");
                }
                skipped_invalid += 1;
                issues.extend(row_issues);
            }
        }
    }

    let upload_id = format!("upl_{}", Ulid::new());
    let first_row = accepted.first().map_or(last_row, |invoice| invoice.row);
    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| dedupe::abort(&map_sqlite_error(db_path, &error), first_row))?;

    let outcome = {
        let mut store = SqliteInvoiceStore::new(&transaction, db_path, &upload_id);
        dedupe::ingest_rows(&mut store, accepted)?
    };

    let summary = UploadSummary {
        rows_read,
        inserted: outcome.inserted.len() as i64,
        skipped_invalid,
        skipped_duplicate: outcome.duplicates.len() as i64,
        rows_malformed,
    };

    transaction
        .execute(
            "INSERT INTO internal_upload_runs (
                upload_id,
                origin,
                source_ref,
                created_at,
                as_of,
                rows_read,
                inserted,
                skipped_invalid,
                skipped_duplicate,
                rows_malformed
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &upload_id,
                request.origin.as_str(),
                request.source_ref,
                now_timestamp(),
                request.today.format("%Y-%m-%d").to_string(),
                summary.rows_read,
                summary.inserted,
                summary.skipped_invalid,
                summary.skipped_duplicate,
                summary.rows_malformed
            ],
        )
        .map_err(|error| dedupe::abort(&map_sqlite_error(db_path, &error), last_row))?;

    transaction
        .commit()
        .map_err(|error| dedupe::abort(&map_sqlite_error(db_path, &error), last_row))?;

    info!(
        upload_id = %upload_id,
        inserted = summary.inserted,
        skipped_invalid = summary.skipped_invalid,
        skipped_duplicate = summary.skipped_duplicate,
        "upload committed"
    );

    let duplicate_summary = UploadDuplicateSummary {
        total: summary.skipped_duplicate,
        batch: outcome.count_reason(DedupeReason::Batch),
        existing_ledger: outcome.count_reason(DedupeReason::ExistingLedger),
    };
    let issues_truncated = issues.len() > PREVIEW_LIMIT;
    issues.truncate(PREVIEW_LIMIT);

    Ok(UploadExecutionResult {
        upload_id,
        summary,
        duplicate_summary,
        duplicates_preview: build_duplicates_preview(&outcome.duplicates),
        issues,
        issues_truncated,
    })
}

fn build_duplicates_preview(rows: &[DuplicateRecord]) -> UploadDuplicatesPreview {
    let preview_rows = rows
        .iter()
        .take(PREVIEW_LIMIT)
        .map(duplicate_record_to_contract)
        .collect::<Vec<UploadDuplicateRow>>();

    UploadDuplicatesPreview {
        returned: preview_rows.len() as i64,
        truncated: rows.len() > PREVIEW_LIMIT,
        rows: preview_rows,
    }
}

fn duplicate_record_to_contract(record: &DuplicateRecord) -> UploadDuplicateRow {
    UploadDuplicateRow {
        row: record.invoice.row,
        dedupe_reason: record.dedupe_reason.as_str().to_string(),
        customer: record.key.customer.clone(),
        due_date: record.key.due_date.clone(),
        description: record.key.description.clone(),
        original_amount: record.key.original_amount.clone(),
        origin: record.key.origin.as_str().to_string(),
        matched_row: record.matched_row,
        matched_invoice_id: record
            .matched
            .as_ref()
            .map(|stored| stored.invoice_id.clone()),
        matched_upload_id: record
            .matched
            .as_ref()
            .map(|stored| stored.upload_id.clone()),
    }
}
