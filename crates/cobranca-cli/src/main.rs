mod cli;
mod dispatch;
mod logging;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use cobranca_client::ClientError;
use stdout_io::write_stdout_text;

const ROOT_HELP: &str = "Cobranca - overdue invoice ledger

Usage:
  cobranca <command>

Start here:
  cobranca invoice upload --help
  cobranca invoice list --overdue
";

const TOP_LEVEL_HELP: &str = "Cobranca - overdue invoice ledger

USAGE: cobranca <command>

Load overdue invoices:
  cobranca invoice upload bank <path>                     Ingest an Itau overdue-titles export
  cobranca invoice upload accounting <path>               Ingest a Conta Azul receivables export
  cobranca invoice uploads                                List past uploads and their tallies

Review what is owed:
  cobranca invoice list                                   List every stored invoice
  cobranca invoice list --overdue                         Only invoices already past due

Send reports:
  cobranca report snapshot --recipient-type DIRETORIA --method EXPORT
  cobranca history list                                   Past sends, newest first

Add `--json` to any of these for machine-readable output.
Run `cobranca <command> --help` for command usage.
";

fn main() -> ExitCode {
    logging::init_logging();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cli = match cli::Cli::try_parse() {
        Ok(value) => value,
        Err(err) => return Err(report_parse_error(&err, &raw_args)),
    };
    let mode = output::mode_for_command(&cli.command);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(code = %error.code, "command failed");
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

/// Help and version requests print and succeed; anything else becomes an
/// `invalid_argument` failure in the requested output mode.
fn report_parse_error(err: &clap::Error, raw_args: &[String]) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let text = if is_top_level_help_request(raw_args) {
                TOP_LEVEL_HELP.to_string()
            } else {
                err.to_string()
            };
            if write_stdout_text(&text).is_err() {
                return ExitCode::from(2);
            }
            ExitCode::SUCCESS
        }
        ErrorKind::DisplayVersion => {
            if write_stdout_text(&err.to_string()).is_err() {
                return ExitCode::from(2);
            }
            ExitCode::SUCCESS
        }
        _ => {
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error = ClientError::invalid_argument_for_command(
                &clean_message,
                command_path_from_args(raw_args).as_deref(),
            );
            let mode = infer_requested_output_mode(raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return ExitCode::from(2);
            }
            ExitCode::from(1)
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Drops clap's trailing usage block so the recovery steps are the only guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let words: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match words.as_slice() {
        ["invoice", "upload", ..] => "invoice upload",
        ["invoice", "list", ..] => "invoice list",
        ["invoice", "uploads", ..] => "invoice uploads",
        ["invoice", ..] => "invoice",
        ["report", "snapshot", ..] => "report snapshot",
        ["report", ..] => "report",
        ["history", "list", ..] => "history list",
        ["history", ..] => "history",
        _ => return None,
    };
    Some(hint.to_string())
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

/// Ledger and storage failures are not fixable by changing the input.
fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_")
        || error.code.starts_with("ledger_")
        || matches!(
            error.code.as_str(),
            "migration_failed" | "ingestion_failed"
        )
}
