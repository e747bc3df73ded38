use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const UPLOAD_HELP_COMMAND: &str = "cobranca invoice upload --help";
pub(crate) const UPLOAD_HELP_SECTION_TITLE: &str = "Upload Troubleshooting";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_upload_help(self) -> Self {
        self.with_upload_help_data(json!({}))
    }

    pub fn with_upload_help_data(self, data: Value) -> Self {
        self.with_data(merge_upload_help_data(data))
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `cobranca {cmd} --help` for usage."),
            None => "Run `cobranca --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_upload(message: &str, origin: &str) -> Self {
        Self::new(
            "invalid_upload",
            message,
            vec![
                "Provide the spreadsheet exactly as exported (xlsx, xls, ods or CSV).".to_string(),
                format!("Run `{UPLOAD_HELP_COMMAND}` to review accepted formats."),
            ],
        )
        .with_upload_help_data(json!({
            "origin": origin,
            "supported_formats": ["xlsx", "xls", "xlsb", "ods", "csv"],
        }))
    }

    /// A required canonical column could not be matched against the table's
    /// header row. Reported before any row is counted.
    pub fn invoice_schema_mismatch(
        missing_field: &str,
        accepted_headers: Vec<String>,
        actual_headers: Vec<String>,
        origin: &str,
    ) -> Self {
        Self::new(
            "invoice_schema_mismatch",
            &format!("Required column is missing: {missing_field}"),
            vec![
                format!(
                    "Add a column named one of: {}.",
                    accepted_headers.join(", ")
                ),
                "Check that the file was exported from the selected origin.".to_string(),
                format!("Run `{UPLOAD_HELP_COMMAND}` to review accepted column names."),
            ],
        )
        .with_upload_help_data(json!({
            "missing_field": missing_field,
            "accepted_headers": accepted_headers,
            "actual_headers": actual_headers,
            "origin": origin,
        }))
    }

    pub fn ingestion_failed(detail: &str, row: i64, cause_code: &str) -> Self {
        Self::new(
            "ingestion_failed",
            &format!("Upload aborted at row {row}: {detail}. No invoices were written."),
            vec![
                "Resolve the storage problem described above.".to_string(),
                "Rerun the same upload; already-ingested invoices are skipped as duplicates."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "row": row,
            "cause_code": cause_code,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn ledger_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_permission_denied",
            &format!("Cannot initialize ledger at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `COBRANCA_HOME` to a writable directory."
            )],
        )
    }

    pub fn ledger_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_locked",
            &format!("Ledger database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn ledger_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_corrupt",
            &format!("Ledger database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite ledger file or restore from backup."
            )],
        )
    }

    pub fn ledger_constraint_violation(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_constraint_violation",
            &format!("Ledger rejected a write at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Ledger migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn ledger_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_failed",
            &format!("Ledger initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

fn merge_upload_help_data(mut data: Value) -> Value {
    if !data.is_object() {
        data = json!({});
    }

    if let Some(object) = data.as_object_mut() {
        object.insert(
            "help_command".to_string(),
            Value::String(UPLOAD_HELP_COMMAND.to_string()),
        );
        object.insert(
            "help_section_title".to_string(),
            Value::String(UPLOAD_HELP_SECTION_TITLE.to_string()),
        );
    }

    data
}

pub type ClientResult<T> = Result<T, ClientError>;
