use crate::cli::{Commands, HistoryCommand, InvoiceCommand, ReportCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Invoice { command } => match command {
            InvoiceCommand::Upload { json, .. }
            | InvoiceCommand::List { json, .. }
            | InvoiceCommand::Uploads { json } => *json,
        },
        Commands::Report {
            command: ReportCommand::Snapshot { json, .. },
        } => *json,
        Commands::History {
            command: HistoryCommand::List { json },
        } => *json,
    };

    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
