use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::info;
use ulid::Ulid;

use crate::commands::common::{query_invoices, sum_amounts};
use crate::contracts::types::{SendHistoryItem, SnapshotData, SnapshotFilters};
use crate::ingest::store::now_timestamp;
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

pub const DEFAULT_REPORT_TYPE: &str = "vencidos";

/// Who a report snapshot is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientType {
    Diretoria,
    Vendedor,
}

impl RecipientType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diretoria => "DIRETORIA",
            Self::Vendedor => "VENDEDOR",
        }
    }

    pub fn parse(value: &str) -> ClientResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DIRETORIA" => Ok(Self::Diretoria),
            "VENDEDOR" => Ok(Self::Vendedor),
            _ => Err(ClientError::invalid_argument_with_recovery(
                &format!("Unknown recipient type `{}`.", value.trim()),
                vec!["Use `DIRETORIA` or `VENDEDOR`.".to_string()],
            )),
        }
    }
}

impl fmt::Display for RecipientType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// How a report snapshot leaves the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMethod {
    Export,
    Whatsapp,
}

impl SendMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Export => "EXPORT",
            Self::Whatsapp => "WHATSAPP",
        }
    }

    pub fn parse(value: &str) -> ClientResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXPORT" => Ok(Self::Export),
            "WHATSAPP" => Ok(Self::Whatsapp),
            _ => Err(ClientError::invalid_argument_with_recovery(
                &format!("Unknown send method `{}`.", value.trim()),
                vec!["Use `EXPORT` or `WHATSAPP`.".to_string()],
            )),
        }
    }
}

impl fmt::Display for SendMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

pub(crate) struct SnapshotRequest<'a> {
    pub(crate) report_type: &'a str,
    pub(crate) recipient_type: RecipientType,
    pub(crate) method: SendMethod,
    pub(crate) recipient_value: Option<&'a str>,
    pub(crate) today: NaiveDate,
}

/// Freezes the invoices overdue on `today` into a snapshot and records the
/// send that goes with it. Both rows commit together.
pub(crate) fn create_snapshot(
    connection: &mut Connection,
    db_path: &Path,
    request: SnapshotRequest<'_>,
) -> ClientResult<SnapshotData> {
    let report_type = request.report_type.trim();
    if report_type.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "Report type must not be empty.",
            Some("report snapshot"),
        ));
    }
    let recipient_value = request
        .recipient_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows = query_invoices(&transaction, db_path, true, request.today)?;
    let filters = SnapshotFilters { only_overdue: true };
    let filters_json = serde_json::to_string(&filters)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    let data_json = serde_json::to_string(&rows)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;

    let snapshot_id = format!("snap_{}", Ulid::new());
    let history_id = format!("send_{}", Ulid::new());
    let created_at = now_timestamp();

    transaction
        .execute(
            "INSERT INTO internal_report_snapshots (
                snapshot_id,
                report_type,
                recipient_type,
                method,
                created_at,
                filters_json,
                data_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &snapshot_id,
                report_type,
                request.recipient_type.as_str(),
                request.method.as_str(),
                &created_at,
                &filters_json,
                &data_json
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    transaction
        .execute(
            "INSERT INTO internal_send_history (
                history_id,
                recipient_type,
                recipient_value,
                report_type,
                method,
                sent_at,
                snapshot_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &history_id,
                request.recipient_type.as_str(),
                &recipient_value,
                report_type,
                request.method.as_str(),
                &created_at,
                &snapshot_id
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    info!(
        snapshot_id = %snapshot_id,
        recipient_type = %request.recipient_type,
        method = %request.method,
        invoices = rows.len(),
        "report snapshot recorded"
    );

    Ok(SnapshotData {
        snapshot_id,
        history_id,
        report_type: report_type.to_string(),
        recipient_type: request.recipient_type.as_str().to_string(),
        method: request.method.as_str().to_string(),
        recipient_value,
        created_at,
        as_of: request.today.format("%Y-%m-%d").to_string(),
        filters,
        invoice_count: rows.len() as i64,
        total_amount: sum_amounts(&rows),
        rows,
    })
}

pub(crate) fn list_history(
    connection: &Connection,
    db_path: &Path,
) -> ClientResult<Vec<SendHistoryItem>> {
    let mut statement = connection
        .prepare(
            "SELECT
                history_id,
                recipient_type,
                recipient_value,
                report_type,
                method,
                sent_at,
                snapshot_id
             FROM internal_send_history
             ORDER BY CAST(sent_at AS INTEGER) DESC, rowid DESC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok(SendHistoryItem {
                history_id: row.get(0)?,
                recipient_type: row.get(1)?,
                recipient_value: row.get(2)?,
                report_type: row.get(3)?,
                method: row.get(4)?,
                sent_at: row.get(5)?,
                snapshot_id: row.get(6)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{RecipientType, SendMethod};

    #[test]
    fn recipient_and_method_parse_case_insensitively() {
        assert_eq!(RecipientType::parse("diretoria").ok(), Some(RecipientType::Diretoria));
        assert_eq!(RecipientType::parse(" VENDEDOR ").ok(), Some(RecipientType::Vendedor));
        assert_eq!(SendMethod::parse("WhatsApp").ok(), Some(SendMethod::Whatsapp));
        assert_eq!(SendMethod::parse("export").ok(), Some(SendMethod::Export));
    }

    #[test]
    fn unknown_recipient_or_method_is_invalid_argument() {
        let recipient = RecipientType::parse("gerente");
        assert!(recipient.is_err());
        if let Err(error) = recipient {
            assert_eq!(error.code, "invalid_argument");
            assert!(error.message.contains("gerente"));
        }

        let method = SendMethod::parse("email");
        assert!(method.is_err());
        if let Err(error) = method {
            assert_eq!(error.code, "invalid_argument");
        }
    }
}
