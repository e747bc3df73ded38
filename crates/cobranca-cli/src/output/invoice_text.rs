use std::io;

use serde_json::Value;

use super::format::{
    self, Align, Column, format_brl, format_local_timestamp, i64_field, rows_of, str_field,
};

pub fn render_upload(data: &Value) -> io::Result<String> {
    let summary = data
        .get("summary")
        .ok_or_else(|| io::Error::other("upload output requires summary"))?;

    let mut lines = vec![
        str_field(data, "message").to_string(),
        String::new(),
        "Summary:".to_string(),
    ];
    lines.extend(format::key_value_rows(
        &[
            ("Upload ID:", str_field(data, "upload_id").to_string()),
            ("Origin:", str_field(data, "origin").to_string()),
            ("Overdue as of:", str_field(data, "as_of").to_string()),
            ("Rows read:", i64_field(summary, "rows_read").to_string()),
            ("Inserted:", i64_field(summary, "inserted").to_string()),
            (
                "Skipped (invalid):",
                i64_field(summary, "skipped_invalid").to_string(),
            ),
            (
                "Skipped (duplicate):",
                i64_field(summary, "skipped_duplicate").to_string(),
            ),
            (
                "Malformed amounts:",
                i64_field(summary, "rows_malformed").to_string(),
            ),
        ],
        2,
    ));

    let issues = rows_of(data, "issues")?;
    if !issues.is_empty() {
        lines.push(String::new());
        lines.extend(render_issues(
            issues,
            data.get("issues_truncated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        ));
    }

    let duplicates = data.get("duplicates_preview");
    let duplicate_rows = duplicates
        .and_then(|preview| preview.get("rows"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if !duplicate_rows.is_empty() {
        let total = data
            .get("duplicate_summary")
            .map(|summary| i64_field(summary, "total"))
            .unwrap_or(0);
        lines.push(String::new());
        if duplicates
            .and_then(|preview| preview.get("truncated"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            lines.push(format!(
                "Duplicates (showing first {} of {total}):",
                duplicate_rows.len()
            ));
        } else {
            lines.push(format!("Duplicates ({total}):"));
        }
        for row in duplicate_rows {
            lines.extend(render_duplicate_row(row));
        }
    }

    if let Some(next_step) = data.get("next_step") {
        lines.push(String::new());
        lines.push("Next step:".to_string());
        lines.push(format!("  {}:", str_field(next_step, "label")));
        lines.push(format!("  {}", str_field(next_step, "command")));
    }

    Ok(lines.join("\n"))
}

fn render_issues(issues: &[Value], truncated: bool) -> Vec<String> {
    let mut lines = vec![if truncated {
        format!("Rejected rows (first {} issues):", issues.len())
    } else {
        "Rejected rows:".to_string()
    }];

    for issue in issues {
        let mut line = format!(
            "  Row {}  {}  {}",
            i64_field(issue, "row"),
            str_field(issue, "field"),
            str_field(issue, "description")
        );
        if let Some(received) = issue.get("received").and_then(Value::as_str) {
            line.push_str(&format!(" (got `{received}`)"));
        }
        lines.push(line);
    }
    lines
}

fn render_duplicate_row(row: &Value) -> Vec<String> {
    let mut lines = vec![format!(
        "  Row {}  {} | {} | {} | {}",
        i64_field(row, "row"),
        str_field(row, "customer"),
        str_field(row, "due_date"),
        format_brl(str_field(row, "original_amount")),
        str_field(row, "description"),
    )];

    match str_field(row, "dedupe_reason") {
        "batch" => lines.push(format!(
            "    Same as row {} in this upload",
            i64_field(row, "matched_row")
        )),
        "existing_ledger" => lines.push(format!(
            "    Already stored as {} (upload {})",
            str_field(row, "matched_invoice_id"),
            str_field(row, "matched_upload_id")
        )),
        _ => {}
    }
    lines
}

pub fn render_invoice_list(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "rows")?;
    let overdue_only = data
        .get("overdue_only")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if rows.is_empty() {
        let headline = if overdue_only {
            "No overdue invoices found."
        } else {
            "No invoices stored yet."
        };
        return Ok([
            headline,
            "",
            "Load some:",
            "  cobranca invoice upload bank <path>",
            "  cobranca invoice upload accounting <path>",
        ]
        .join("\n"));
    }

    let noun = if overdue_only { "overdue invoice" } else { "invoice" };
    let mut lines = vec![
        if rows.len() == 1 {
            format!("1 {noun} (as of {}).", str_field(data, "as_of"))
        } else {
            format!("{} {noun}s (as of {}).", rows.len(), str_field(data, "as_of"))
        },
        String::new(),
    ];

    let columns = [
        Column {
            name: "Due",
            align: Align::Left,
        },
        Column {
            name: "Days late",
            align: Align::Right,
        },
        Column {
            name: "Customer",
            align: Align::Left,
        },
        Column {
            name: "Description",
            align: Align::Left,
        },
        Column {
            name: "Amount",
            align: Align::Right,
        },
        Column {
            name: "Salesperson",
            align: Align::Left,
        },
        Column {
            name: "Origin",
            align: Align::Left,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                str_field(row, "due_date").to_string(),
                i64_field(row, "days_overdue").to_string(),
                str_field(row, "customer").to_string(),
                str_field(row, "description").to_string(),
                format_brl(str_field(row, "original_amount")),
                str_field(row, "salesperson").to_string(),
                str_field(row, "origin").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Invoice",
    ));

    lines.push(String::new());
    lines.push(format!(
        "Total: {}",
        format_brl(str_field(data, "total_amount"))
    ));
    Ok(lines.join("\n"))
}

pub fn render_upload_runs(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "rows")?;
    if rows.is_empty() {
        return Ok([
            "No uploads yet.",
            "",
            "Run your first upload:",
            "  cobranca invoice upload --help",
        ]
        .join("\n"));
    }

    let mut lines = vec![
        if rows.len() == 1 {
            "1 upload found.".to_string()
        } else {
            format!("{} uploads found.", rows.len())
        },
        String::new(),
    ];

    let columns = [
        Column {
            name: "Upload ID",
            align: Align::Left,
        },
        Column {
            name: "Created (local)",
            align: Align::Left,
        },
        Column {
            name: "Origin",
            align: Align::Left,
        },
        Column {
            name: "Read",
            align: Align::Right,
        },
        Column {
            name: "Inserted",
            align: Align::Right,
        },
        Column {
            name: "Invalid",
            align: Align::Right,
        },
        Column {
            name: "Duplicate",
            align: Align::Right,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                str_field(row, "upload_id").to_string(),
                format_local_timestamp(str_field(row, "created_at")),
                str_field(row, "origin").to_string(),
                i64_field(row, "rows_read").to_string(),
                i64_field(row, "inserted").to_string(),
                i64_field(row, "skipped_invalid").to_string(),
                i64_field(row, "skipped_duplicate").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Upload",
    ));

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_invoice_list, render_upload, render_upload_runs};

    #[test]
    fn upload_renders_tally_issues_and_duplicates() {
        let payload = json!({
            "upload_id": "upl_1",
            "origin": "ITAU",
            "as_of": "2024-06-01",
            "message": "Upload processed. 1 overdue invoice(s) added.",
            "summary": {
                "rows_read": 3,
                "inserted": 1,
                "skipped_invalid": 1,
                "skipped_duplicate": 1,
                "rows_malformed": 0
            },
            "duplicate_summary": {"total": 1, "batch": 0, "existing_ledger": 1},
            "duplicates_preview": {
                "returned": 1,
                "truncated": false,
                "rows": [{
                    "row": 4,
                    "dedupe_reason": "existing_ledger",
                    "customer": "Acme",
                    "due_date": "2024-01-10",
                    "description": "Invoice 1",
                    "original_amount": "500.00",
                    "origin": "ITAU",
                    "matched_invoice_id": "inv_9",
                    "matched_upload_id": "upl_0"
                }]
            },
            "issues": [{
                "row": 3,
                "field": "due_date",
                "code": "due_date_not_past",
                "description": "Due date is not before today.",
                "received": "2024-07-01"
            }],
            "issues_truncated": false,
            "next_step": {
                "label": "Review overdue invoices",
                "command": "cobranca invoice list --overdue"
            }
        });

        let rendered = render_upload(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Upload processed. 1 overdue invoice(s) added."));
            assert!(text.contains("  Upload ID:            upl_1"));
            assert!(text.contains("  Skipped (duplicate):  1"));
            assert!(text.contains("Rejected rows:"));
            assert!(text.contains("  Row 3  due_date  Due date is not before today. (got `2024-07-01`)"));
            assert!(text.contains("Duplicates (1):"));
            assert!(text.contains("  Row 4  Acme | 2024-01-10 | R$ 500,00 | Invoice 1"));
            assert!(text.contains("    Already stored as inv_9 (upload upl_0)"));
            assert!(text.contains("  cobranca invoice list --overdue"));
        }
    }

    #[test]
    fn upload_without_summary_is_an_error() {
        assert!(render_upload(&json!({"issues": []})).is_err());
    }

    #[test]
    fn invoice_list_renders_rows_and_total() {
        let payload = json!({
            "overdue_only": true,
            "as_of": "2024-06-01",
            "total": 1,
            "total_amount": "1234.56",
            "rows": [{
                "invoice_id": "inv_1",
                "customer": "Beta",
                "due_date": "2024-02-20",
                "description": "Invoice 2",
                "original_amount": "1234.56",
                "salesperson": "Rui",
                "origin": "CONTA_AZUL",
                "days_overdue": 102
            }]
        });

        let rendered = render_invoice_list(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("1 overdue invoice (as of 2024-06-01)."));
            assert!(text.contains("Beta"));
            assert!(text.contains("102"));
            assert!(text.contains("Total: R$ 1.234,56"));
        }
    }

    #[test]
    fn empty_lists_point_at_upload() {
        let invoices = render_invoice_list(&json!({"overdue_only": false, "rows": []}));
        assert!(invoices.is_ok());
        if let Ok(text) = invoices {
            assert!(text.starts_with("No invoices stored yet."));
        }

        let runs = render_upload_runs(&json!({"rows": []}));
        assert!(runs.is_ok());
        if let Ok(text) = runs {
            assert!(text.starts_with("No uploads yet."));
        }
    }
}
