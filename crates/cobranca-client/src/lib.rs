pub mod commands;
pub mod contracts;
pub mod error;
mod ingest;
pub mod migrations;
mod report;
pub mod setup;
pub mod state;

pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{ClientError, ClientResult};
pub use ingest::origin::Origin;
pub use report::{DEFAULT_REPORT_TYPE, RecipientType, SendMethod};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
