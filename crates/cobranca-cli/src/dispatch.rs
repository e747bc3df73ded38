use cobranca_client::commands::{invoice, report};
use cobranca_client::commands::invoice::{InvoiceListOptions, UploadOptions};
use cobranca_client::commands::report::SnapshotOptions;
use cobranca_client::{ClientResult, RecipientType, SendMethod, SuccessEnvelope};

use crate::cli::{Cli, Commands, HistoryCommand, InvoiceCommand, ReportCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Invoice { command } => match command {
            InvoiceCommand::Upload {
                origin,
                path,
                as_of,
                json: _,
            } => invoice::upload_with_options(UploadOptions {
                origin: origin.origin(),
                path: Some(path.clone()),
                content: None,
                as_of: *as_of,
                home_override: None,
            }),
            InvoiceCommand::List { overdue, as_of, .. } => {
                invoice::list_with_options(InvoiceListOptions {
                    overdue_only: *overdue,
                    as_of: *as_of,
                    home_override: None,
                })
            }
            InvoiceCommand::Uploads { .. } => invoice::uploads(),
        },
        Commands::Report { command } => match command {
            ReportCommand::Snapshot {
                recipient_type,
                method,
                report_type,
                recipient_value,
                as_of,
                json: _,
            } => report::snapshot_with_options(SnapshotOptions {
                report_type: report_type.clone(),
                recipient_type: RecipientType::parse(recipient_type)?,
                method: SendMethod::parse(method)?,
                recipient_value: recipient_value.clone(),
                as_of: *as_of,
                home_override: None,
            }),
        },
        Commands::History { command } => match command {
            HistoryCommand::List { .. } => report::history(),
        },
    }
}
