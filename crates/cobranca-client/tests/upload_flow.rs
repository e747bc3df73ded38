use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use cobranca_client::Origin;
use cobranca_client::commands::invoice::{
    self, InvoiceListOptions, UploadListOptions, UploadOptions,
};
use cobranca_client::contracts::envelope::failure_from_error;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::tempdir;

const SCENARIO_TABLE: &str = "cliente,vencimento,descricao,valor,vendedor\n\
Acme,2024-01-10,Invoice 1,500.00,Joana\n\
Acme,2099-01-10,Invoice 2,200.00,Joana\n";

fn temp_home() -> std::io::Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempdir()?;
    let home = dir.path().join("ledger-home");
    Ok((dir, home))
}

fn as_of() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 6, 1)
}

fn run_upload(
    home: &Path,
    origin: Origin,
    body: &[u8],
) -> cobranca_client::ClientResult<cobranca_client::SuccessEnvelope> {
    invoice::upload_with_options(UploadOptions {
        origin,
        path: Some("upload.csv".to_string()),
        content: Some(body.to_vec()),
        as_of: as_of(),
        home_override: Some(home),
    })
}

fn upload_json(home: &Path, origin: Origin, body: &str) -> Value {
    let result = run_upload(home, origin, body.as_bytes());
    assert!(result.is_ok(), "upload failed: {:?}", result.as_ref().err());
    if let Ok(envelope) = result {
        let value = serde_json::to_value(envelope);
        assert!(value.is_ok());
        if let Ok(json) = value {
            return json;
        }
    }
    Value::Null
}

fn assert_tally(payload: &Value, inserted: i64, skipped_invalid: i64, skipped_duplicate: i64) {
    let summary = &payload["data"]["summary"];
    assert_eq!(summary["inserted"], Value::from(inserted));
    assert_eq!(summary["skipped_invalid"], Value::from(skipped_invalid));
    assert_eq!(summary["skipped_duplicate"], Value::from(skipped_duplicate));
}

fn query_count(db_path: &Path, sql: &str) -> i64 {
    let connection = Connection::open(db_path);
    assert!(connection.is_ok());
    if let Ok(conn) = connection {
        let value = conn.query_row(sql, [], |row| row.get::<_, i64>(0));
        assert!(value.is_ok());
        if let Ok(count) = value {
            return count;
        }
    }
    0
}

fn query_strings(db_path: &Path, sql: &str) -> Vec<String> {
    let mut values = Vec::new();
    let connection = Connection::open(db_path);
    assert!(connection.is_ok());
    if let Ok(conn) = connection {
        let statement = conn.prepare(sql);
        assert!(statement.is_ok());
        if let Ok(mut stmt) = statement {
            let rows = stmt.query_map([], |row| row.get::<_, String>(0));
            assert!(rows.is_ok());
            if let Ok(iter) = rows {
                for value in iter.flatten() {
                    values.push(value);
                }
            }
        }
    }
    values
}

#[test]
fn first_upload_inserts_overdue_row_and_rejects_future_row() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let payload = upload_json(&home, Origin::Itau, SCENARIO_TABLE);

        assert_eq!(payload["ok"], Value::Bool(true));
        assert_eq!(payload["command"], Value::String("invoice upload".to_string()));
        assert_tally(&payload, 1, 1, 0);
        assert_eq!(payload["data"]["summary"]["rows_read"], Value::from(2));
        assert_eq!(payload["data"]["origin"], Value::String("ITAU".to_string()));
        assert_eq!(payload["data"]["as_of"], Value::String("2024-06-01".to_string()));
        assert_eq!(payload["data"]["issues"][0]["row"], Value::from(2));
        assert_eq!(
            payload["data"]["issues"][0]["code"],
            Value::String("due_date_not_past".to_string())
        );

        let db_path = home.join("ledger.db");
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_invoices"), 1);
        assert_eq!(
            query_strings(&db_path, "SELECT origin FROM internal_invoices"),
            vec!["ITAU".to_string()]
        );
    }
}

#[test]
fn reupload_of_same_table_reports_duplicate() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let first = upload_json(&home, Origin::Itau, SCENARIO_TABLE);
        assert_tally(&first, 1, 1, 0);

        let second = upload_json(&home, Origin::Itau, SCENARIO_TABLE);
        assert_tally(&second, 0, 1, 1);
        assert_eq!(
            second["data"]["duplicate_summary"]["existing_ledger"],
            Value::from(1)
        );
        let duplicate = &second["data"]["duplicates_preview"]["rows"][0];
        assert_eq!(duplicate["row"], Value::from(1));
        assert_eq!(
            duplicate["dedupe_reason"],
            Value::String("existing_ledger".to_string())
        );
        assert_eq!(
            duplicate["matched_upload_id"],
            first["data"]["upload_id"].clone()
        );

        let db_path = home.join("ledger.db");
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_invoices"), 1);
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_upload_runs"), 2);
    }
}

#[test]
fn missing_amount_column_fails_whole_upload() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let body = "cliente,vencimento,descricao,vendedor\nAcme,2024-01-10,Invoice 1,Joana\n";
        let result = run_upload(&home, Origin::Itau, body.as_bytes());
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invoice_schema_mismatch");
            assert!(error.message.contains("original_amount"));
            let envelope = failure_from_error(&error);
            let json = serde_json::to_value(envelope);
            assert!(json.is_ok());
            if let Ok(payload) = json {
                assert_eq!(payload["ok"], Value::Bool(false));
                assert_eq!(
                    payload["data"]["missing_field"],
                    Value::String("original_amount".to_string())
                );
            }
        }

        let db_path = home.join("ledger.db");
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_invoices"), 0);
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_upload_runs"), 0);
    }
}

#[test]
fn identical_rows_in_one_upload_insert_once() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Acme,2024-01-10,Invoice 1,500,Joana\n\
                    Acme,10/01/2024,Invoice 1,\"500,00\",Rui\n";
        let payload = upload_json(&home, Origin::Itau, body);
        assert_tally(&payload, 1, 0, 1);
        assert_eq!(payload["data"]["duplicate_summary"]["batch"], Value::from(1));
        assert_eq!(
            payload["data"]["duplicates_preview"]["rows"][0]["matched_row"],
            Value::from(1)
        );
    }
}

#[test]
fn same_invoice_from_each_origin_is_kept_separately() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let bank = upload_json(&home, Origin::Itau, SCENARIO_TABLE);
        assert_tally(&bank, 1, 1, 0);

        let accounting_body = "Razao Social;Data de Vencimento;Observacao;Valor Original;Conta\n\
                               Acme;10/01/2024;Invoice 1;500,00;Joana\n";
        let accounting = upload_json(&home, Origin::ContaAzul, accounting_body);
        assert_tally(&accounting, 1, 0, 0);

        let db_path = home.join("ledger.db");
        assert_eq!(
            query_strings(
                &db_path,
                "SELECT origin FROM internal_invoices ORDER BY origin ASC"
            ),
            vec!["CONTA_AZUL".to_string(), "ITAU".to_string()]
        );
    }
}

#[test]
fn amounts_are_stored_as_exact_decimal_text() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Acme,2024-01-10,Invoice 1,1234.50,Joana\n\
                    Beta,2024-01-11,Invoice 2,0.1,Joana\n";
        let payload = upload_json(&home, Origin::Itau, body);
        assert_tally(&payload, 2, 0, 0);

        let db_path = home.join("ledger.db");
        assert_eq!(
            query_strings(
                &db_path,
                "SELECT original_amount FROM internal_invoices ORDER BY due_date ASC"
            ),
            vec!["1234.50".to_string(), "0.10".to_string()]
        );
    }
}

#[test]
fn malformed_amount_is_counted_separately_inside_invalid() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Acme,2024-01-10,Invoice 1,abc,Joana\n\
                    Acme,2024-01-11,Invoice 2,,Joana\n\
                    ,2024-01-12,Invoice 3,10,Joana\n";
        let payload = upload_json(&home, Origin::Itau, body);
        assert_tally(&payload, 0, 3, 0);
        assert_eq!(payload["data"]["summary"]["rows_malformed"], Value::from(1));

        let codes = payload["data"]["issues"]
            .as_array()
            .map(|issues| {
                issues
                    .iter()
                    .filter_map(|issue| issue["code"].as_str().map(str::to_string))
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default();
        assert_eq!(
            codes,
            vec![
                "malformed_amount".to_string(),
                "non_positive_amount".to_string(),
                "missing_required_field".to_string(),
            ]
        );
    }
}

#[test]
fn unreadable_upload_is_invalid_upload() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let result = run_upload(&home, Origin::ContaAzul, b"");
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invalid_upload");
        }
    }
}

#[test]
fn upload_reads_file_from_path() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((temp, home)) = home_result {
        let file_path = temp.path().join("itau.csv");
        let write_result = fs::write(&file_path, SCENARIO_TABLE);
        assert!(write_result.is_ok());

        let result = invoice::upload_with_options(UploadOptions {
            origin: Origin::Itau,
            path: Some(file_path.display().to_string()),
            content: None,
            as_of: as_of(),
            home_override: Some(&home),
        });
        assert!(result.is_ok());
        if let Ok(envelope) = result {
            assert_eq!(envelope.data["summary"]["inserted"], Value::from(1));
        }

        let missing = invoice::upload_with_options(UploadOptions {
            origin: Origin::Itau,
            path: Some(temp.path().join("nope.csv").display().to_string()),
            content: None,
            as_of: as_of(),
            home_override: Some(&home),
        });
        assert!(missing.is_err());
        if let Err(error) = missing {
            assert_eq!(error.code, "invalid_upload");
        }
    }
}

#[test]
fn storage_failure_rolls_back_the_whole_batch() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let first = upload_json(&home, Origin::Itau, SCENARIO_TABLE);
        assert_tally(&first, 1, 1, 0);

        // Rows after the first insert trip this trigger.
        let db_path = home.join("ledger.db");
        let connection = Connection::open(&db_path);
        assert!(connection.is_ok());
        if let Ok(conn) = connection {
            let trigger = conn.execute_batch(
                "CREATE TRIGGER reject_beta BEFORE INSERT ON internal_invoices
                 WHEN NEW.customer = 'Beta'
                 BEGIN SELECT RAISE(ABORT, 'beta rejected'); END;",
            );
            assert!(trigger.is_ok());
        }

        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Gama,2024-01-10,Invoice 7,10,Joana\n\
                    Beta,2024-01-10,Invoice 8,20,Joana\n";
        let result = run_upload(&home, Origin::Itau, body.as_bytes());
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "ingestion_failed");
            assert!(error.data.is_some());
            if let Some(data) = error.data {
                assert_eq!(data["row"], Value::from(2));
            }
        }

        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_invoices"), 1);
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_upload_runs"), 1);
    }
}

#[test]
fn refused_upload_run_record_is_an_ingestion_failure() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let first = upload_json(&home, Origin::Itau, SCENARIO_TABLE);
        assert_tally(&first, 1, 1, 0);

        let db_path = home.join("ledger.db");
        let connection = Connection::open(&db_path);
        assert!(connection.is_ok());
        if let Ok(conn) = connection {
            let trigger = conn.execute_batch(
                "CREATE TRIGGER reject_runs BEFORE INSERT ON internal_upload_runs
                 BEGIN SELECT RAISE(ABORT, 'upload runs are frozen'); END;",
            );
            assert!(trigger.is_ok());
        }

        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Gama,2024-01-10,Invoice 7,10,Joana\n\
                    Delta,2024-02-10,Invoice 8,20,Rui\n";
        let result = run_upload(&home, Origin::Itau, body.as_bytes());
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "ingestion_failed");
            assert!(error.message.contains("row 2"));
            assert!(error.data.is_some());
            if let Some(data) = error.data {
                assert_eq!(data["row"], Value::from(2));
                assert_eq!(
                    data["cause_code"],
                    Value::String("ledger_constraint_violation".to_string())
                );
            }
        }

        // Both invoices were inserted before the run record failed; neither survives.
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_invoices"), 1);
        assert_eq!(query_count(&db_path, "SELECT COUNT(*) FROM internal_upload_runs"), 1);
    }
}

#[test]
fn list_filters_overdue_and_uploads_are_newest_first() {
    let home_result = temp_home();
    assert!(home_result.is_ok());
    if let Ok((_temp, home)) = home_result {
        let body = "cliente,vencimento,descricao,valor,vendedor\n\
                    Acme,2024-03-10,Invoice 1,500.00,Joana\n\
                    Beta,2024-01-10,Invoice 2,250.50,Rui\n";
        let first = upload_json(&home, Origin::Itau, body);
        assert_tally(&first, 2, 0, 0);
        let second = upload_json(&home, Origin::Itau, body);
        assert_tally(&second, 0, 0, 2);

        let listed = invoice::list_with_options(InvoiceListOptions {
            overdue_only: true,
            as_of: NaiveDate::from_ymd_opt(2024, 2, 1),
            home_override: Some(&home),
        });
        assert!(listed.is_ok());
        if let Ok(envelope) = listed {
            assert_eq!(envelope.command, "invoice list");
            assert_eq!(envelope.data["total"], Value::from(1));
            assert_eq!(envelope.data["rows"][0]["customer"], Value::String("Beta".to_string()));
            assert_eq!(envelope.data["rows"][0]["days_overdue"], Value::from(22));
            assert_eq!(
                envelope.data["total_amount"],
                Value::String("250.50".to_string())
            );
        }

        let everything = invoice::list_with_options(InvoiceListOptions {
            overdue_only: false,
            as_of: as_of(),
            home_override: Some(&home),
        });
        assert!(everything.is_ok());
        if let Ok(envelope) = everything {
            assert_eq!(envelope.data["total"], Value::from(2));
            assert_eq!(
                envelope.data["total_amount"],
                Value::String("750.50".to_string())
            );
        }

        let uploads = invoice::uploads_with_options(UploadListOptions {
            home_override: Some(&home),
        });
        assert!(uploads.is_ok());
        if let Ok(envelope) = uploads {
            assert_eq!(envelope.data["rows"][0]["upload_id"], second["data"]["upload_id"]);
            assert_eq!(envelope.data["rows"][1]["inserted"], Value::from(2));
        }
    }
}
