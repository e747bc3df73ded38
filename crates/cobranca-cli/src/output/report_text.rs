use std::io;

use serde_json::Value;

use super::format::{
    self, Align, Column, format_brl, format_local_timestamp, i64_field, rows_of, str_field,
};

pub fn render_snapshot(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "rows")?;
    let recipient = match data.get("recipient_value").and_then(Value::as_str) {
        Some(value) => format!("{} ({value})", str_field(data, "recipient_type")),
        None => str_field(data, "recipient_type").to_string(),
    };

    let mut lines = vec![
        "Report snapshot recorded.".to_string(),
        String::new(),
    ];
    lines.extend(format::key_value_rows(
        &[
            ("Snapshot ID:", str_field(data, "snapshot_id").to_string()),
            ("Send ID:", str_field(data, "history_id").to_string()),
            ("Report:", str_field(data, "report_type").to_string()),
            ("Recipient:", recipient),
            ("Method:", str_field(data, "method").to_string()),
            ("Overdue as of:", str_field(data, "as_of").to_string()),
            ("Invoices:", i64_field(data, "invoice_count").to_string()),
            ("Total:", format_brl(str_field(data, "total_amount"))),
        ],
        2,
    ));

    lines.push(String::new());
    if rows.is_empty() {
        lines.push("No invoices were overdue; the send was recorded empty.".to_string());
        return Ok(lines.join("\n"));
    }

    let columns = [
        Column {
            name: "Customer",
            align: Align::Left,
        },
        Column {
            name: "Due",
            align: Align::Left,
        },
        Column {
            name: "Days late",
            align: Align::Right,
        },
        Column {
            name: "Amount",
            align: Align::Right,
        },
        Column {
            name: "Salesperson",
            align: Align::Left,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                str_field(row, "customer").to_string(),
                str_field(row, "due_date").to_string(),
                i64_field(row, "days_overdue").to_string(),
                format_brl(str_field(row, "original_amount")),
                str_field(row, "salesperson").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Invoice",
    ));

    Ok(lines.join("\n"))
}

pub fn render_history(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "rows")?;
    if rows.is_empty() {
        return Ok([
            "No reports sent yet.",
            "",
            "Send one:",
            "  cobranca report snapshot --recipient-type DIRETORIA --method EXPORT",
        ]
        .join("\n"));
    }

    let mut lines = vec![
        if rows.len() == 1 {
            "1 send recorded.".to_string()
        } else {
            format!("{} sends recorded.", rows.len())
        },
        String::new(),
    ];

    let columns = [
        Column {
            name: "Sent (local)",
            align: Align::Left,
        },
        Column {
            name: "Recipient",
            align: Align::Left,
        },
        Column {
            name: "To",
            align: Align::Left,
        },
        Column {
            name: "Report",
            align: Align::Left,
        },
        Column {
            name: "Method",
            align: Align::Left,
        },
        Column {
            name: "Snapshot ID",
            align: Align::Left,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                format_local_timestamp(str_field(row, "sent_at")),
                str_field(row, "recipient_type").to_string(),
                row.get("recipient_value")
                    .and_then(Value::as_str)
                    .unwrap_or("-")
                    .to_string(),
                str_field(row, "report_type").to_string(),
                str_field(row, "method").to_string(),
                str_field(row, "snapshot_id").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Send",
    ));

    Ok(lines.join("\n"))
}
