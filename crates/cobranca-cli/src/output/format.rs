use std::cmp;

use chrono::{Local, TimeZone};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: &str = "  ";
const COLUMN_GAP: &str = "  ";

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders an aligned table, or one labelled block per row when the table
/// would not fit in `max_width`.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let widths = column_widths(columns, rows);
    let table_width =
        INDENT.len() + widths.iter().sum::<usize>() + COLUMN_GAP.len() * (widths.len() - 1);
    if table_width > max_width {
        return render_blocks(columns, rows, block_label);
    }

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<String>>();
    let mut output = vec![format_row(columns, &header, &widths)];
    output.extend(rows.iter().map(|row| format_row(columns, row, &widths)));
    output
}

fn column_widths(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .fold(column.name.chars().count(), cmp::max)
        })
        .collect()
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (column, width))| {
            let value = cells.get(index).map(String::as_str).unwrap_or("");
            match column.align {
                Align::Left => format!("{value:<width$}"),
                Align::Right => format!("{value:>width$}"),
            }
        })
        .collect::<Vec<String>>();

    format!("{INDENT}{}", pieces.join(COLUMN_GAP)).trim_end().to_string()
}

fn render_blocks(columns: &[Column<'_>], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let labels = columns
        .iter()
        .map(|column| format!("{}:", column.name))
        .collect::<Vec<String>>();
    let label_width = labels.iter().map(String::len).max().unwrap_or(0);

    let mut output = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            output.push(String::new());
        }
        output.push(format!("{INDENT}{block_label} {}:", row_index + 1));
        for (column_index, label) in labels.iter().enumerate() {
            let value = row.get(column_index).map(String::as_str).unwrap_or("");
            output.push(format!("    {label:<label_width$}  {value}"));
        }
    }
    output
}

/// Formats a canonical decimal string (`1234.5`, `-10.125`) as Brazilian
/// currency. Anything unparseable is shown as-is.
pub fn format_brl(amount: &str) -> String {
    let (negative, unsigned) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if integer.is_empty() || !integer.bytes().all(|byte| byte.is_ascii_digit()) {
        return amount.to_string();
    }

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let mut cents = fraction.to_string();
    while cents.len() < 2 {
        cents.push('0');
    }
    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents}")
}

/// Unix-seconds text rendered in the local timezone.
pub fn format_local_timestamp(raw: &str) -> String {
    let Ok(seconds) = raw.trim().parse::<i64>() else {
        return "unknown".to_string();
    };
    match Local.timestamp_opt(seconds, 0).single() {
        Some(local) => local.format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown".to_string(),
    }
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

pub fn i64_field(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

pub fn rows_of<'a>(data: &'a Value, key: &str) -> std::io::Result<&'a Vec<Value>> {
    data.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| std::io::Error::other(format!("output requires `{key}`")))
}

#[cfg(test)]
mod tests {
    use super::{Align, Column, format_brl, format_local_timestamp, key_value_rows, render_table_or_blocks};

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[
                ("Rows read:", "3".to_string()),
                ("Inserted:", "1".to_string()),
            ],
            2,
        );

        assert_eq!(rows[0], "  Rows read:  3");
        assert_eq!(rows[1], "  Inserted:   1");
    }

    #[test]
    fn table_aligns_columns_to_widest_cell() {
        let columns = [
            Column {
                name: "Customer",
                align: Align::Left,
            },
            Column {
                name: "Amount",
                align: Align::Right,
            },
        ];
        let rows = vec![
            vec!["Acme".to_string(), "R$ 500,00".to_string()],
            vec!["Beta Comercio".to_string(), "R$ 1.234,56".to_string()],
        ];

        let rendered = render_table_or_blocks(&columns, &rows, 80, "Invoice");
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0], "  Customer            Amount");
        assert_eq!(rendered[1], "  Acme             R$ 500,00");
        assert_eq!(rendered[2], "  Beta Comercio  R$ 1.234,56");
    }

    #[test]
    fn narrow_width_falls_back_to_blocks() {
        let columns = [
            Column {
                name: "Customer",
                align: Align::Left,
            },
            Column {
                name: "Description",
                align: Align::Left,
            },
        ];
        let rows = vec![vec![
            "Acme".to_string(),
            "Boleto 0001 parcela 3 de 12".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns, &rows, 20, "Invoice");
        assert_eq!(rendered[0], "  Invoice 1:");
        assert!(rendered[1].contains("Customer:"));
        assert!(rendered[2].contains("Boleto 0001 parcela 3 de 12"));
    }

    #[test]
    fn brl_groups_thousands_and_pads_cents() {
        assert_eq!(format_brl("1234.56"), "R$ 1.234,56");
        assert_eq!(format_brl("500.00"), "R$ 500,00");
        assert_eq!(format_brl("1234567.5"), "R$ 1.234.567,50");
        assert_eq!(format_brl("10.125"), "R$ 10,125");
        assert_eq!(format_brl("-42"), "-R$ 42,00");
        assert_eq!(format_brl("n/a"), "n/a");
    }

    #[test]
    fn unparseable_timestamp_is_unknown() {
        assert_eq!(format_local_timestamp("yesterday"), "unknown");
        assert_ne!(format_local_timestamp("1717200000"), "unknown");
    }
}
