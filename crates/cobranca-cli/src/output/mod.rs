mod error_text;
mod format;
mod invoice_text;
mod json;
mod mode;
mod report_text;

use std::io;

use cobranca_client::{ClientError, SuccessEnvelope};

pub use mode::{OutputMode, mode_for_command};

use crate::stdout_io::write_stdout_line;

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "invoice upload" => invoice_text::render_upload(&success.data),
        "invoice list" => invoice_text::render_invoice_list(&success.data),
        "invoice uploads" => invoice_text::render_upload_runs(&success.data),
        "report snapshot" => report_text::render_snapshot(&success.data),
        "history list" => report_text::render_history(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
