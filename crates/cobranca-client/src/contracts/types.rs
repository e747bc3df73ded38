use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct UploadData {
    pub upload_id: String,
    pub origin: String,
    pub path: Option<String>,
    pub as_of: String,
    pub message: String,
    pub summary: UploadSummary,
    pub duplicate_summary: UploadDuplicateSummary,
    pub duplicates_preview: UploadDuplicatesPreview,
    pub issues: Vec<UploadIssue>,
    pub issues_truncated: bool,
    pub next_step: UploadNextStep,
}

/// Per-upload tally. `rows_malformed` is a subset of `skipped_invalid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub rows_read: i64,
    pub inserted: i64,
    pub skipped_invalid: i64,
    pub skipped_duplicate: i64,
    pub rows_malformed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadNextStep {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadDuplicateSummary {
    pub total: i64,
    pub batch: i64,
    pub existing_ledger: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadDuplicateRow {
    pub row: i64,
    pub dedupe_reason: String,
    pub customer: String,
    pub due_date: String,
    pub description: String,
    pub original_amount: String,
    pub origin: String,
    pub matched_row: Option<i64>,
    pub matched_invoice_id: Option<String>,
    pub matched_upload_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadDuplicatesPreview {
    pub returned: i64,
    pub truncated: bool,
    pub rows: Vec<UploadDuplicateRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadIssue {
    pub row: i64,
    pub field: String,
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRunItem {
    pub upload_id: String,
    pub origin: String,
    pub source_ref: Option<String>,
    pub created_at: String,
    pub as_of: String,
    pub rows_read: i64,
    pub inserted: i64,
    pub skipped_invalid: i64,
    pub skipped_duplicate: i64,
    pub rows_malformed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRunListData {
    pub rows: Vec<UploadRunItem>,
}

/// A persisted invoice. Amounts travel as exact decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub invoice_id: String,
    pub upload_id: String,
    pub customer: String,
    pub due_date: String,
    pub description: String,
    pub original_amount: String,
    pub salesperson: String,
    pub origin: String,
    pub created_at: String,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListData {
    pub overdue_only: bool,
    pub as_of: String,
    pub total: i64,
    pub total_amount: String,
    pub rows: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFilters {
    pub only_overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotData {
    pub snapshot_id: String,
    pub history_id: String,
    pub report_type: String,
    pub recipient_type: String,
    pub method: String,
    pub recipient_value: Option<String>,
    pub created_at: String,
    pub as_of: String,
    pub filters: SnapshotFilters,
    pub invoice_count: i64,
    pub total_amount: String,
    pub rows: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendHistoryItem {
    pub history_id: String,
    pub recipient_type: String,
    pub recipient_value: Option<String>,
    pub report_type: String,
    pub method: String,
    pub sent_at: String,
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryListData {
    pub rows: Vec<SendHistoryItem>,
}
