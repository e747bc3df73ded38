use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDate, TimeDelta};

use crate::{ClientError, ClientResult};

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &str = "\u{feff}";

/// One spreadsheet cell as the reader produced it, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Error(String),
}

impl RawCell {
    pub(crate) fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            return Self::Empty;
        }
        Self::Text(value.to_string())
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Renders the cell the way a user would read it in the sheet.
    pub(crate) fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) | Self::Error(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Date(value) => value.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub(crate) row: i64,
    pub(crate) cells: Vec<RawCell>,
}

impl RawRow {
    pub(crate) fn cell(&self, index: usize) -> Option<&RawCell> {
        self.cells.get(index)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RawTable {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<RawRow>,
}

pub(crate) fn parse_table(content: &[u8], origin: &str) -> ClientResult<RawTable> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(ClientError::invalid_upload("Uploaded file is empty.", origin));
    }

    let grid = if looks_like_workbook(content) {
        read_workbook(content, origin)?
    } else {
        read_csv(content, origin)?
    };

    table_from_grid(grid, origin)
}

fn looks_like_workbook(content: &[u8]) -> bool {
    content.starts_with(&ZIP_MAGIC) || content.starts_with(&OLE_MAGIC)
}

fn read_workbook(content: &[u8], origin: &str) -> ClientResult<Vec<Vec<RawCell>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content)).map_err(|error| {
        ClientError::invalid_upload(&format!("Could not open spreadsheet: {error}"), origin)
    })?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ClientError::invalid_upload("Spreadsheet has no worksheets.", origin))?;

    let range = workbook.worksheet_range(&first_sheet).map_err(|error| {
        ClientError::invalid_upload(
            &format!("Could not read worksheet `{first_sheet}`: {error}"),
            origin,
        )
    })?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_workbook).collect())
        .collect())
}

pub(crate) fn cell_from_workbook(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            RawCell::text(value)
        }
        Data::Int(value) => RawCell::Integer(*value),
        Data::Float(value) => RawCell::Float(*value),
        Data::Bool(value) => RawCell::Bool(*value),
        Data::DateTime(value) => {
            let serial = value.as_f64();
            match date_from_serial(serial) {
                Some(date) => RawCell::Date(date),
                None => RawCell::Float(serial),
            }
        }
        Data::Error(error) => RawCell::Error(error.to_string()),
    }
}

/// Last serial a spreadsheet can hold (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Spreadsheet serial day numbers count from 1899-12-30.
pub(crate) fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(TimeDelta::try_days(serial.floor() as i64)?)
}

fn read_csv(content: &[u8], origin: &str) -> ClientResult<Vec<Vec<RawCell>>> {
    let text = decode_text(content);
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| {
            ClientError::invalid_upload(&format!("CSV rows are malformed: {error}"), origin)
        })?;
        grid.push(record.iter().map(RawCell::text).collect());
    }
    Ok(grid)
}

// Exports that are not UTF-8 come out of Windows tools as Latin-1.
fn decode_text(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => content.iter().map(|byte| char::from(*byte)).collect(),
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

fn table_from_grid(grid: Vec<Vec<RawCell>>, origin: &str) -> ClientResult<RawTable> {
    let mut lines = grid
        .into_iter()
        .skip_while(|cells| cells.iter().all(RawCell::is_empty));

    let Some(header_cells) = lines.next() else {
        return Err(ClientError::invalid_upload(
            "Spreadsheet has no header row.",
            origin,
        ));
    };
    let headers = header_cells
        .iter()
        .map(|cell| cell.render().trim().to_string())
        .collect::<Vec<String>>();

    let rows = lines
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(RawCell::is_empty))
        .map(|(index, cells)| RawRow {
            row: (index as i64) + 1,
            cells,
        })
        .collect();

    Ok(RawTable { headers, rows })
}
