use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::ClientResult;
use crate::commands::common::{load_setup, resolve_today};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::HistoryListData;
use crate::report::{
    self, DEFAULT_REPORT_TYPE, RecipientType, SendMethod, SnapshotRequest,
};
use crate::state::open_connection;

#[derive(Debug)]
pub struct SnapshotOptions<'a> {
    pub report_type: Option<String>,
    pub recipient_type: RecipientType,
    pub method: SendMethod,
    pub recipient_value: Option<String>,
    pub as_of: Option<NaiveDate>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct HistoryOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn snapshot(
    recipient_type: RecipientType,
    method: SendMethod,
    recipient_value: Option<String>,
) -> ClientResult<SuccessEnvelope> {
    snapshot_with_options(SnapshotOptions {
        report_type: None,
        recipient_type,
        method,
        recipient_value,
        as_of: None,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn snapshot_with_options(options: SnapshotOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let mut connection = open_connection(&db_path)?;

    let data = report::create_snapshot(
        &mut connection,
        &db_path,
        SnapshotRequest {
            report_type: options.report_type.as_deref().unwrap_or(DEFAULT_REPORT_TYPE),
            recipient_type: options.recipient_type,
            method: options.method,
            recipient_value: options.recipient_value.as_deref(),
            today: resolve_today(options.as_of),
        },
    )?;

    success("report snapshot", data)
}

pub fn history() -> ClientResult<SuccessEnvelope> {
    history_with_options(HistoryOptions {
        home_override: None,
    })
}

#[doc(hidden)]
pub fn history_with_options(options: HistoryOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;
    let rows = report::list_history(&connection, &db_path)?;

    success("history list", HistoryListData { rows })
}
