use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use cobranca_client::Origin;

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0usize, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|index| bytes[*index].is_ascii_digit());
    if !shaped {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "date must use valid calendar values".to_string())
}

/// Extended help shown after `cobranca invoice upload --help`.
pub const INVOICE_UPLOAD_AFTER_HELP: &str = "\
How upload works:
  Pick the origin that produced the spreadsheet, then pass its path.
    bank        Itau overdue-titles export
    accounting  Conta Azul receivables export

  Accepted formats: .xlsx, .xls, .ods workbooks (first sheet) and CSV
  (comma or semicolon separated, UTF-8 or Latin-1).

  Only invoices already past due are kept. A row is skipped when:
    - customer or description is blank
    - the due date is missing, unreadable, or not before today
    - the amount is zero, negative, or not a number
  Rows already in the ledger (same customer, due date, amount,
  description, and origin) are reported as duplicates and left untouched.

Recognized columns (header case is ignored; all five are required):
  bank:        cliente | sacado | nome do cliente
               vencimento | data vencimento
               descricao | historico
               valor | valor original
               vendedor | carteira | responsavel
  accounting:  cliente | razao social | nome
               vencimento | data de vencimento
               descricao | observacao
               valor original | valor
               vendedor | responsavel | conta

What to do next:
  1. Run `cobranca invoice upload bank <path>` (or `accounting`).
  2. Run `cobranca invoice list --overdue` to review what was stored.
";

#[derive(Debug, Parser)]
#[command(
    name = "cobranca",
    version,
    about = "overdue invoice ledger",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload spreadsheets and inspect stored invoices
    #[command(arg_required_else_help = true)]
    Invoice {
        #[command(subcommand)]
        command: InvoiceCommand,
    },
    /// Freeze overdue invoices into a report for a recipient
    #[command(arg_required_else_help = true)]
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Inspect past report sends
    #[command(arg_required_else_help = true)]
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    /// Itau bank export
    Bank,
    /// Conta Azul accounting export
    Accounting,
}

impl OriginArg {
    pub fn origin(self) -> Origin {
        match self {
            Self::Bank => Origin::Itau,
            Self::Accounting => Origin::ContaAzul,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum InvoiceCommand {
    /// Ingest overdue invoices from a bank or accounting spreadsheet
    #[command(after_long_help = INVOICE_UPLOAD_AFTER_HELP)]
    Upload {
        /// Which system produced the spreadsheet
        #[arg(value_enum)]
        origin: OriginArg,
        /// Path to the spreadsheet or CSV file
        path: String,
        /// Treat this day as today when judging overdue (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        as_of: Option<NaiveDate>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List stored invoices ordered by due date
    List {
        /// Only show invoices whose due date has passed
        #[arg(long)]
        overdue: bool,
        /// Treat this day as today when judging overdue (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        as_of: Option<NaiveDate>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List past uploads with their tallies
    Uploads {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ReportCommand {
    /// Snapshot today's overdue invoices and record the send
    Snapshot {
        /// DIRETORIA or VENDEDOR
        #[arg(long)]
        recipient_type: String,
        /// EXPORT or WHATSAPP
        #[arg(long)]
        method: String,
        /// Report label stored with the snapshot
        #[arg(long)]
        report_type: Option<String>,
        /// Free-form recipient, such as a salesperson name or phone
        #[arg(long)]
        recipient_value: Option<String>,
        /// Treat this day as today when judging overdue (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        as_of: Option<NaiveDate>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum HistoryCommand {
    /// List report sends, newest first
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
