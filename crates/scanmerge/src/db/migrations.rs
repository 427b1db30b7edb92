//! Schema bootstrap.
//!
//! Table names come from configuration, so each step renders its SQL from
//! the configured [`TableNames`]. Every step is `IF NOT EXISTS` and runs on
//! every open; against a pre-existing archive database the steps are no-ops.

use rusqlite::Connection;

use super::error::DatabaseError;
use crate::config::schema::{is_sql_identifier, TableNames};

/// A single schema step.
struct SchemaStep {
    description: &'static str,
    render: fn(&TableNames) -> String,
}

/// All steps in order.
const STEPS: &[SchemaStep] = &[
    SchemaStep {
        description: "create_input_table",
        render: input_table_sql,
    },
    SchemaStep {
        description: "create_detail_table",
        render: detail_table_sql,
    },
    SchemaStep {
        description: "create_record_table",
        render: record_table_sql,
    },
    SchemaStep {
        description: "create_artifact_table",
        render: artifact_table_sql,
    },
];

fn input_table_sql(t: &TableNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {input} (
            case_id TEXT PRIMARY KEY,
            archive_code TEXT NOT NULL,
            process_type INTEGER NOT NULL DEFAULT 0,
            relocate_source INTEGER NOT NULL DEFAULT 0,
            image_set TEXT,
            outcome INTEGER NOT NULL DEFAULT 1,
            processed_at TEXT,
            fail_reason TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_{input}_outcome ON {input} (outcome);",
        input = t.input
    )
}

fn detail_table_sql(t: &TableNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {detail} (
            case_id TEXT PRIMARY KEY,
            archive_code TEXT NOT NULL,
            sub_project TEXT,
            project TEXT,
            image_set TEXT
        );",
        detail = t.detail
    )
}

fn record_table_sql(t: &TableNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {record} (
            record_id TEXT PRIMARY KEY,
            archives_id TEXT NOT NULL,
            borrow_state INTEGER NOT NULL,
            inventory_status INTEGER NOT NULL,
            pdf_size INTEGER NOT NULL,
            status INTEGER NOT NULL,
            suffix TEXT NOT NULL,
            sys_from INTEGER NOT NULL,
            seq_no INTEGER NOT NULL,
            label TEXT NOT NULL,
            title TEXT NOT NULL,
            annotation TEXT NOT NULL,
            page_count INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            shard_id TEXT NOT NULL,
            case_id TEXT NOT NULL,
            sub_project TEXT,
            project TEXT,
            url TEXT NOT NULL,
            upload_server_id INTEGER NOT NULL,
            server_type INTEGER NOT NULL,
            real_path TEXT NOT NULL,
            sync_state INTEGER NOT NULL,
            md5 TEXT NOT NULL,
            sm3 TEXT NOT NULL,
            is_full_text INTEGER NOT NULL,
            zone INTEGER NOT NULL,
            is_file_pdf INTEGER NOT NULL,
            is_public INTEGER NOT NULL,
            composite_status INTEGER NOT NULL,
            check_status INTEGER NOT NULL,
            file_status INTEGER NOT NULL,
            update_md5 INTEGER NOT NULL,
            sync_flag INTEGER,
            process_state INTEGER NOT NULL,
            has_metadata INTEGER NOT NULL,
            is_classified INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{record}_case_id ON {record} (case_id);",
        record = t.record
    )
}

fn artifact_table_sql(t: &TableNames) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {artifact} (
            record_id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            storage_path TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{artifact}_case_id ON {artifact} (case_id);",
        artifact = t.artifact
    )
}

/// Runs all schema steps on the given connection.
pub fn run_all(conn: &Connection, tables: &TableNames) -> Result<(), DatabaseError> {
    for name in tables.all() {
        if !is_sql_identifier(name) {
            return Err(DatabaseError::Migration {
                step: "validate_table_names",
                reason: format!("Invalid table name: {}", name),
            });
        }
    }

    for step in STEPS {
        log::debug!("Applying schema step: {}", step.description);

        conn.execute_batch(&(step.render)(tables))
            .map_err(|e| DatabaseError::Migration {
                step: step.description,
                reason: e.to_string(),
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_count(conn: &Connection, table: &str) -> usize {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .unwrap();
        let count = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .count();
        count
    }

    #[test]
    fn test_steps_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn, &TableNames::default()).unwrap();

        assert_eq!(column_count(&conn, "file_input"), 8);
        assert_eq!(column_count(&conn, "eam_file"), 5);
        assert_eq!(column_count(&conn, "eam_record"), 37);
        assert_eq!(column_count(&conn, "input_pdf"), 3);
    }

    #[test]
    fn test_steps_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn, &TableNames::default()).unwrap();
        run_all(&conn, &TableNames::default()).unwrap();

        assert_eq!(column_count(&conn, "eam_record"), 37);
    }

    #[test]
    fn test_custom_table_names() {
        let conn = Connection::open_in_memory().unwrap();
        let tables = TableNames {
            input: "work".to_string(),
            detail: "details".to_string(),
            record: "records".to_string(),
            artifact: "artifacts".to_string(),
        };
        run_all(&conn, &tables).unwrap();
        assert_eq!(column_count(&conn, "records"), 37);
        assert_eq!(column_count(&conn, "eam_record"), 0);
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let tables = TableNames {
            record: "x; DROP TABLE y".to_string(),
            ..TableNames::default()
        };
        assert!(matches!(
            run_all(&conn, &tables),
            Err(DatabaseError::Migration { .. })
        ));
    }
}
