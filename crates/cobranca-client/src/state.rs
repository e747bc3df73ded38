//! Where the invoice ledger lives on disk, and how storage failures surface.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Error as SqliteError, ffi::ErrorCode};
use tracing::debug;

use crate::{ClientError, ClientResult};

pub const HOME_ENV_VAR: &str = "COBRANCA_HOME";

const DEFAULT_HOME_DIR: &str = ".cobranca";
const LEDGER_FILE: &str = "ledger.db";
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// The ledger directory and the SQLite file inside it, both absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLocation {
    pub home: PathBuf,
    pub db_path: PathBuf,
}

impl LedgerLocation {
    /// An explicit override wins, then `COBRANCA_HOME`, then `~/.cobranca`.
    pub fn resolve(home_override: Option<&Path>) -> ClientResult<Self> {
        let home = match home_override {
            Some(path) => path.to_path_buf(),
            None => default_home()?,
        };
        let home = std::path::absolute(&home).map_err(|error| {
            ClientError::ledger_init_failed(
                &home,
                &format!("cannot turn the ledger home into an absolute path ({error})"),
            )
        })?;

        Ok(Self {
            db_path: home.join(LEDGER_FILE),
            home,
        })
    }

    /// Creates the ledger directory if needed and keeps it private to the owner.
    pub fn prepare(&self) -> ClientResult<()> {
        fs::create_dir_all(&self.home).map_err(|error| map_io_error(&self.home, &error))?;
        restrict_to_owner(&self.home);
        Ok(())
    }

    pub fn open(&self) -> ClientResult<Connection> {
        open_connection(&self.db_path)
    }
}

fn default_home() -> ClientResult<PathBuf> {
    if let Some(value) = std::env::var_os(HOME_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(PathBuf::from(value));
    }

    home::home_dir()
        .map(|dir| dir.join(DEFAULT_HOME_DIR))
        .ok_or_else(|| {
            ClientError::ledger_init_failed(
                Path::new(DEFAULT_HOME_DIR),
                "no user home directory was found; set COBRANCA_HOME to choose where invoices are kept",
            )
        })
}

/// Opens the ledger; writers wait briefly for a concurrent upload to finish.
pub fn open_connection(db_path: &Path) -> ClientResult<Connection> {
    let connection =
        Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .busy_timeout(BUSY_TIMEOUT)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(connection)
}

pub fn map_io_error(path: &Path, error: &io::Error) -> ClientError {
    let detail = format!("cannot create the invoice ledger directory ({error})");
    match error.kind() {
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            ClientError::ledger_init_permission_denied(path, &detail)
        }
        _ => ClientError::ledger_init_failed(path, &detail),
    }
}

/// How a SQLite failure reads to someone running an upload or a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageFault {
    Busy,
    NotALedger,
    RejectedWrite,
    Unwritable,
    Other,
}

fn classify(error: &SqliteError) -> StorageFault {
    match error.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StorageFault::Busy,
        Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt) => StorageFault::NotALedger,
        Some(ErrorCode::ConstraintViolation) => StorageFault::RejectedWrite,
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly | ErrorCode::PermissionDenied) => {
            StorageFault::Unwritable
        }
        _ => StorageFault::Other,
    }
}

pub fn map_sqlite_error(path: &Path, error: &SqliteError) -> ClientError {
    match classify(error) {
        StorageFault::Busy => ClientError::ledger_locked(path),
        StorageFault::NotALedger => ClientError::ledger_corrupt(path),
        StorageFault::RejectedWrite => ClientError::ledger_constraint_violation(
            path,
            &format!("an invoice or upload record was refused ({error})"),
        ),
        StorageFault::Unwritable => ClientError::ledger_init_permission_denied(
            path,
            &format!("the ledger file cannot be opened for writing ({error})"),
        ),
        StorageFault::Other => ClientError::ledger_init_failed(path, &error.to_string()),
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(error) = fs::set_permissions(path, fs::Permissions::from_mode(0o700)) {
        debug!(path = %path.display(), %error, "could not restrict ledger directory");
    }
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) {}
