use cobranca_client::ClientError;
use serde_json::Value;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "Something went wrong, but it's easy to fix.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
    ];
    lines.extend(render_context(error));

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

/// Extra lines for errors whose data says more than the message.
fn render_context(error: &ClientError) -> Vec<String> {
    let Some(data) = error.data.as_ref() else {
        return Vec::new();
    };

    match error.code.as_str() {
        "invoice_schema_mismatch" => {
            let mut lines = Vec::new();
            if let Some(origin) = data.get("origin").and_then(Value::as_str) {
                lines.push(format!("  Origin:   {origin}"));
            }
            lines.push(format!("  Found:    {}", joined(data.get("actual_headers"))));
            lines
        }
        "ingestion_failed" => data
            .get("cause_code")
            .and_then(Value::as_str)
            .map(|cause| vec![format!("  Cause:    {cause}")])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn joined(values: Option<&Value>) -> String {
    let names = values
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<&str>>()
        })
        .unwrap_or_default();
    if names.is_empty() {
        "(no headers)".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use cobranca_client::ClientError;

    use super::render_error;

    #[test]
    fn renders_standard_error_layout() {
        let error = ClientError::invalid_argument_with_recovery(
            "bad input",
            vec!["run cobranca --help".to_string()],
        );

        let rendered = render_error(&error);
        assert!(rendered.starts_with("Something went wrong, but it's easy to fix."));
        assert!(rendered.contains("  Error:    invalid_argument"));
        assert!(rendered.contains("  Details:  bad input"));
        assert!(rendered.contains("What to do next:"));
        assert!(rendered.contains("  1. run cobranca --help"));
    }

    #[test]
    fn schema_mismatch_lists_headers_that_were_found() {
        let error = ClientError::invoice_schema_mismatch(
            "original_amount",
            vec!["valor".to_string(), "valor original".to_string()],
            vec!["Cliente".to_string(), "Vencimento".to_string()],
            "CONTA_AZUL",
        );

        let rendered = render_error(&error);
        assert!(rendered.contains("Required column is missing: original_amount"));
        assert!(rendered.contains("  Origin:   CONTA_AZUL"));
        assert!(rendered.contains("  Found:    Cliente, Vencimento"));
        assert!(rendered.contains("  1. Add a column named one of: valor, valor original."));
    }

    #[test]
    fn empty_recovery_falls_back_to_retry() {
        let error = ClientError::new("ledger_init_failed", "boom", Vec::new());
        let rendered = render_error(&error);
        assert!(rendered.contains("  1. Retry the command."));
    }
}
