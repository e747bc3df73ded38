use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ingest::columns::{CanonicalField, ResolvedColumns};
use crate::ingest::origin::Origin;
use crate::ingest::table::{RawCell, RawRow, date_from_serial};

const TEXT_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// A row mapped onto canonical fields but not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CandidateInvoice {
    pub(crate) row: i64,
    pub(crate) customer: String,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) description: String,
    pub(crate) original_amount: Result<Decimal, AmountCoercionError>,
    pub(crate) salesperson: String,
    pub(crate) origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{raw}` is not a monetary amount")]
pub(crate) struct AmountCoercionError {
    pub(crate) raw: String,
}

pub(crate) fn normalize_row(
    row: &RawRow,
    columns: &ResolvedColumns,
    origin: Origin,
) -> CandidateInvoice {
    let cell = |field: CanonicalField| row.cell(columns.get(field).index);

    CandidateInvoice {
        row: row.row,
        customer: text_value(cell(CanonicalField::Customer)),
        due_date: date_value(cell(CanonicalField::DueDate)),
        description: text_value(cell(CanonicalField::Description)),
        original_amount: amount_value(cell(CanonicalField::OriginalAmount)),
        salesperson: text_value(cell(CanonicalField::Salesperson)),
        origin,
    }
}

pub(crate) fn text_value(cell: Option<&RawCell>) -> String {
    cell.map(|value| value.render().trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn date_value(cell: Option<&RawCell>) -> Option<NaiveDate> {
    match cell? {
        RawCell::Date(date) => Some(*date),
        RawCell::Integer(serial) => date_from_serial(*serial as f64),
        RawCell::Float(serial) => date_from_serial(*serial),
        RawCell::Text(text) => parse_date_text(text),
        RawCell::Empty | RawCell::Bool(_) | RawCell::Error(_) => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let date_part = text
        .trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or_default();
    if date_part.is_empty() {
        return None;
    }

    TEXT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Missing amounts become zero and fail validation later. Anything present
/// goes through text so the decimal keeps exactly what the sheet showed.
pub(crate) fn amount_value(cell: Option<&RawCell>) -> Result<Decimal, AmountCoercionError> {
    let Some(cell) = cell else {
        return Ok(Decimal::ZERO);
    };

    match cell {
        RawCell::Empty => Ok(Decimal::ZERO),
        RawCell::Integer(value) => Ok(Decimal::from(*value)),
        RawCell::Float(value) if value.is_finite() => parse_amount_text(&value.to_string())
            .ok_or_else(|| AmountCoercionError {
                raw: value.to_string(),
            }),
        RawCell::Text(text) => parse_amount_text(text).ok_or_else(|| AmountCoercionError {
            raw: text.trim().to_string(),
        }),
        other => Err(AmountCoercionError { raw: other.render() }),
    }
}

fn parse_amount_text(raw: &str) -> Option<Decimal> {
    let compact = raw
        .replace("R$", "")
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>();
    if compact.is_empty() {
        return None;
    }

    let (sign, unsigned) = match compact.strip_prefix(['-', '+']) {
        Some(rest) => (&compact[..1], rest),
        None => ("", compact.as_str()),
    };
    let canonical = format!("{sign}{}", canonical_digits(unsigned)?);

    if !canonical
        .chars()
        .all(|character| character.is_ascii_digit() || matches!(character, '.' | '-' | '+'))
    {
        return None;
    }

    Decimal::from_str(&canonical).ok()
}

/// Rewrites an unsigned amount with `.` as the only decimal separator.
///
/// When both `,` and `.` appear, the last one is the decimal separator
/// (`1.234,56` and `1,234.56`). A lone separator repeated more than once
/// groups thousands. A single `,` is decimal, as is a single `.`.
fn canonical_digits(unsigned: &str) -> Option<String> {
    let last_comma = unsigned.rfind(',');
    let last_dot = unsigned.rfind('.');

    let (integer, fraction) = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            let (decimal_at, grouping) = if comma > dot { (comma, '.') } else { (dot, ',') };
            let integer = ungroup(&unsigned[..decimal_at], grouping)?;
            (integer, Some(&unsigned[decimal_at + 1..]))
        }
        (Some(_), None) if unsigned.matches(',').count() > 1 => (ungroup(unsigned, ',')?, None),
        (None, Some(_)) if unsigned.matches('.').count() > 1 => (ungroup(unsigned, '.')?, None),
        (Some(comma), None) => (unsigned[..comma].to_string(), Some(&unsigned[comma + 1..])),
        _ => return Some(unsigned.to_string()),
    };

    match fraction {
        Some(digits) if digits.chars().all(|character| character.is_ascii_digit()) => {
            Some(format!("{integer}.{digits}"))
        }
        Some(_) => None,
        None => Some(integer),
    }
}

/// Drops thousands separators, rejecting groups that are not three digits.
fn ungroup(integer: &str, separator: char) -> Option<String> {
    let mut groups = integer.split(separator);
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 {
        return None;
    }

    let mut digits = lead.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}
