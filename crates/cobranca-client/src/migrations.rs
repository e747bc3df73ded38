use std::collections::HashMap;

use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");
const REPORT_SNAPSHOTS_SQL: &str = include_str!("migrations/0002_report_snapshots.sql");

const MIGRATION_SOURCES: [&str; 2] = [BOOTSTRAP_SQL, REPORT_SNAPSHOTS_SQL];

pub const REQUIRED_INDEX_NAMES: [&str; 6] = [
    "uq_internal_invoices_dedupe_key",
    "idx_internal_invoices_due_date",
    "idx_internal_invoices_upload_id",
    "idx_internal_upload_runs_created_at_desc",
    "idx_internal_send_history_sent_at_desc",
    "idx_internal_send_history_snapshot_id",
];

pub const REQUIRED_META_KEYS: [(&str, &str); 3] = [
    ("schema_version", "v1"),
    ("invoice_contract_version", "v1"),
    ("report_contract_version", "v1"),
];

pub const LATEST_USER_VERSION: i64 = MIGRATION_SOURCES.len() as i64;

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(MIGRATION_SOURCES.into_iter().map(M::up).collect());
    migrations.to_latest(conn)
}

pub fn safe_repair_statement(statement_name: &str) -> Option<String> {
    parse_safe_repair_statements().remove(statement_name)
}

fn parse_safe_repair_statements() -> HashMap<String, String> {
    let mut blocks: HashMap<String, String> = HashMap::new();

    for source in MIGRATION_SOURCES {
        let mut active_name: Option<String> = None;
        let mut active_sql = String::new();

        for line in source.lines() {
            let trimmed = line.trim();

            if let Some(name) = trimmed.strip_prefix("-- cobranca:safe_repair:start:") {
                active_name = Some(name.to_string());
                active_sql.clear();
                continue;
            }

            if let Some(name) = trimmed.strip_prefix("-- cobranca:safe_repair:end:") {
                if let Some(active) = &active_name
                    && active == name
                {
                    blocks.insert(name.to_string(), active_sql.trim().to_string());
                }
                active_name = None;
                active_sql.clear();
                continue;
            }

            if active_name.is_some() {
                active_sql.push_str(line);
                active_sql.push('\n');
            }
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::{REQUIRED_INDEX_NAMES, safe_repair_statement};

    #[test]
    fn safe_repair_statement_exists_for_every_required_index() {
        for name in REQUIRED_INDEX_NAMES {
            let sql = safe_repair_statement(name);
            assert!(sql.is_some(), "missing repair block for {name}");
            if let Some(body) = sql {
                assert!(body.contains(name));
            }
        }
    }

    #[test]
    fn unknown_repair_block_is_absent() {
        assert!(safe_repair_statement("idx_does_not_exist").is_none());
    }
}
