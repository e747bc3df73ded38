use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::commands::common::{format_day, load_setup, query_invoices, resolve_today, sum_amounts};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    InvoiceListData, UploadData, UploadNextStep, UploadRunItem, UploadRunListData,
};
use crate::ingest::origin::Origin;
use crate::ingest::{self, UploadRequest};
use crate::state::{map_sqlite_error, open_connection};
use crate::{ClientError, ClientResult};

#[derive(Debug)]
pub struct UploadOptions<'a> {
    pub origin: Origin,
    pub path: Option<String>,
    /// Raw upload bytes. When absent the file at `path` is read.
    pub content: Option<Vec<u8>>,
    pub as_of: Option<NaiveDate>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct InvoiceListOptions<'a> {
    pub overdue_only: bool,
    pub as_of: Option<NaiveDate>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct UploadListOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn upload(origin: Origin, path: &str) -> ClientResult<SuccessEnvelope> {
    upload_with_options(UploadOptions {
        origin,
        path: Some(path.to_string()),
        content: None,
        as_of: None,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn upload_with_options(options: UploadOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let content = match (options.content, options.path.as_deref()) {
        (Some(content), _) => content,
        (None, Some(path)) => read_upload_file(path, options.origin)?,
        (None, None) => {
            return Err(ClientError::invalid_argument_for_command(
                "An upload needs a spreadsheet path.",
                Some("invoice upload"),
            ));
        }
    };

    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let mut connection = open_connection(&db_path)?;
    let today = resolve_today(options.as_of);

    let execution = ingest::execute(
        &mut connection,
        &db_path,
        UploadRequest {
            origin: options.origin,
            content: &content,
            source_ref: options.path.as_deref(),
            today,
        },
    )?;

    let message = if execution.summary.inserted == 0 {
        "Upload processed. No new overdue invoices were added.".to_string()
    } else {
        format!(
            "Upload processed. {} overdue invoice(s) added.",
            execution.summary.inserted
        )
    };

    let data = UploadData {
        upload_id: execution.upload_id,
        origin: options.origin.as_str().to_string(),
        path: options.path,
        as_of: format_day(today),
        message,
        summary: execution.summary,
        duplicate_summary: execution.duplicate_summary,
        duplicates_preview: execution.duplicates_preview,
        issues: execution.issues,
        issues_truncated: execution.issues_truncated,
        next_step: UploadNextStep {
            label: "Review overdue invoices".to_string(),
            command: "cobranca invoice list --overdue".to_string(),
        },
    };

    success("invoice upload", data)
}

fn read_upload_file(path: &str, origin: Origin) -> ClientResult<Vec<u8>> {
    std::fs::read(path).map_err(|error| {
        let message = if error.kind() == std::io::ErrorKind::NotFound {
            format!("Upload file `{path}` was not found.")
        } else {
            format!("Could not read upload file `{path}`: {error}")
        };
        ClientError::invalid_upload(&message, origin.as_str())
    })
}

pub fn list(overdue_only: bool) -> ClientResult<SuccessEnvelope> {
    list_with_options(InvoiceListOptions {
        overdue_only,
        as_of: None,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn list_with_options(options: InvoiceListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;
    let today = resolve_today(options.as_of);

    let rows = query_invoices(&connection, &db_path, options.overdue_only, today)?;
    let data = InvoiceListData {
        overdue_only: options.overdue_only,
        as_of: format_day(today),
        total: rows.len() as i64,
        total_amount: sum_amounts(&rows),
        rows,
    };

    success("invoice list", data)
}

pub fn uploads() -> ClientResult<SuccessEnvelope> {
    uploads_with_options(UploadListOptions {
        home_override: None,
    })
}

#[doc(hidden)]
pub fn uploads_with_options(options: UploadListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;
    let mut statement = connection
        .prepare(
            "SELECT
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
             FROM internal_upload_runs
             ORDER BY CAST(created_at AS INTEGER) DESC, rowid DESC",
        )
        .map_err(|error| map_sqlite_error(&db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok(UploadRunItem {
                upload_id: row.get(0)?,
                origin: row.get(1)?,
                source_ref: row.get(2)?,
                created_at: row.get(3)?,
                as_of: row.get(4)?,
                rows_read: row.get(5)?,
                inserted: row.get(6)?,
                skipped_invalid: row.get(7)?,
                skipped_duplicate: row.get(8)?,
                rows_malformed: row.get(9)?,
            })
        })
        .map_err(|error| map_sqlite_error(&db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(&db_path, &error))?);
    }

    success("invoice uploads", UploadRunListData { rows })
}
