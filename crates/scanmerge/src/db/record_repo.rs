//! Record repository: archival records and their artifact index.
//!
//! Every archival record has one artifact row naming the storage folder of
//! its document. Both are written and deleted together.

use rusqlite::{params, params_from_iter, Connection, Row};

use super::{placeholders, Database, DatabaseError};

/// A raw archival record row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub record_id: String,
    pub archives_id: String,
    pub borrow_state: i64,
    pub inventory_status: i64,
    pub pdf_size: i64,
    pub status: i64,
    pub suffix: String,
    pub sys_from: i64,
    /// Per-case sequence number, starting at 1.
    pub seq_no: i64,
    pub label: String,
    pub title: String,
    pub annotation: String,
    pub page_count: i64,
    pub quantity: i64,
    pub shard_id: String,
    pub case_id: String,
    pub sub_project: Option<String>,
    pub project: Option<String>,
    pub url: String,
    pub upload_server_id: i64,
    pub server_type: i64,
    pub real_path: String,
    pub sync_state: i64,
    pub md5: String,
    pub sm3: String,
    pub is_full_text: i64,
    /// 1 = outer zone, 2 = inner zone.
    pub zone: i64,
    pub is_file_pdf: i64,
    pub is_public: i64,
    pub composite_status: i64,
    pub check_status: i64,
    pub file_status: i64,
    pub update_md5: i64,
    pub sync_flag: Option<i64>,
    pub process_state: i64,
    pub has_metadata: i64,
    pub is_classified: i64,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            record_id: row.get("record_id")?,
            archives_id: row.get("archives_id")?,
            borrow_state: row.get("borrow_state")?,
            inventory_status: row.get("inventory_status")?,
            pdf_size: row.get("pdf_size")?,
            status: row.get("status")?,
            suffix: row.get("suffix")?,
            sys_from: row.get("sys_from")?,
            seq_no: row.get("seq_no")?,
            label: row.get("label")?,
            title: row.get("title")?,
            annotation: row.get("annotation")?,
            page_count: row.get("page_count")?,
            quantity: row.get("quantity")?,
            shard_id: row.get("shard_id")?,
            case_id: row.get("case_id")?,
            sub_project: row.get("sub_project")?,
            project: row.get("project")?,
            url: row.get("url")?,
            upload_server_id: row.get("upload_server_id")?,
            server_type: row.get("server_type")?,
            real_path: row.get("real_path")?,
            sync_state: row.get("sync_state")?,
            md5: row.get("md5")?,
            sm3: row.get("sm3")?,
            is_full_text: row.get("is_full_text")?,
            zone: row.get("zone")?,
            is_file_pdf: row.get("is_file_pdf")?,
            is_public: row.get("is_public")?,
            composite_status: row.get("composite_status")?,
            check_status: row.get("check_status")?,
            file_status: row.get("file_status")?,
            update_md5: row.get("update_md5")?,
            sync_flag: row.get("sync_flag")?,
            process_state: row.get("process_state")?,
            has_metadata: row.get("has_metadata")?,
            is_classified: row.get("is_classified")?,
        })
    }
}

/// Storage folder of a previously written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRow {
    pub record_id: String,
    pub case_id: String,
    pub storage_path: String,
}

/// Lists the artifacts written for a case.
pub fn find_artifacts(db: &Database, case_id: &str) -> Result<Vec<ArtifactRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT record_id, case_id, storage_path FROM {} WHERE case_id = ?1
             ORDER BY record_id",
            db.tables().artifact
        ))?;
        let rows = stmt
            .query_map(params![case_id], |row| {
                Ok(ArtifactRow {
                    record_id: row.get(0)?,
                    case_id: row.get(1)?,
                    storage_path: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists the archival records of a case ordered by sequence number.
pub fn find_by_case(db: &Database, case_id: &str) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE case_id = ?1 ORDER BY seq_no",
            db.tables().record
        ))?;
        let rows = stmt
            .query_map(params![case_id], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes records and their artifact rows in one transaction, one batched
/// statement per table. Returns the number of records removed.
pub fn delete_records(db: &Database, record_ids: &[String]) -> Result<usize, DatabaseError> {
    if record_ids.is_empty() {
        return Ok(0);
    }

    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let in_clause = placeholders(record_ids.len());

        let removed = tx.execute(
            &format!(
                "DELETE FROM {} WHERE record_id IN ({})",
                db.tables().record,
                in_clause
            ),
            params_from_iter(record_ids.iter()),
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE record_id IN ({})",
                db.tables().artifact,
                in_clause
            ),
            params_from_iter(record_ids.iter()),
        )?;

        tx.commit()?;
        Ok(removed)
    })
}

/// Highest sequence number recorded for a case, if any.
pub fn max_sequence(db: &Database, case_id: &str) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| query_max_sequence(conn, &db.tables().record, case_id))
}

fn query_max_sequence(
    conn: &Connection,
    table: &str,
    case_id: &str,
) -> Result<Option<i64>, DatabaseError> {
    let max: Option<i64> = conn.query_row(
        &format!("SELECT MAX(seq_no) FROM {} WHERE case_id = ?1", table),
        params![case_id],
        |r| r.get(0),
    )?;
    Ok(max)
}

/// Computes the next sequence number for `case_id`, builds the record with it
/// and writes the record plus its artifact row, all under one lock and one
/// transaction.
pub fn insert_with_next_sequence<F>(
    db: &Database,
    case_id: &str,
    storage_path: &str,
    build: F,
) -> Result<RecordRow, DatabaseError>
where
    F: FnOnce(i64) -> RecordRow,
{
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let next = query_max_sequence(&tx, &db.tables().record, case_id)?.unwrap_or(0) + 1;
        let record = build(next);

        insert_record(&tx, &db.tables().record, &record)?;
        tx.execute(
            &format!(
                "INSERT INTO {} (record_id, case_id, storage_path) VALUES (?1, ?2, ?3)",
                db.tables().artifact
            ),
            params![record.record_id, record.case_id, storage_path],
        )?;

        tx.commit()?;
        Ok(record)
    })
}

fn insert_record(conn: &Connection, table: &str, r: &RecordRow) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (record_id, archives_id, borrow_state, inventory_status, pdf_size,
             status, suffix, sys_from, seq_no, label, title, annotation, page_count, quantity,
             shard_id, case_id, sub_project, project, url, upload_server_id, server_type,
             real_path, sync_state, md5, sm3, is_full_text, zone, is_file_pdf, is_public,
             composite_status, check_status, file_status, update_md5, sync_flag,
             process_state, has_metadata, is_classified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32,
             ?33, ?34, ?35, ?36, ?37)",
            table
        ),
        params![
            r.record_id,
            r.archives_id,
            r.borrow_state,
            r.inventory_status,
            r.pdf_size,
            r.status,
            r.suffix,
            r.sys_from,
            r.seq_no,
            r.label,
            r.title,
            r.annotation,
            r.page_count,
            r.quantity,
            r.shard_id,
            r.case_id,
            r.sub_project,
            r.project,
            r.url,
            r.upload_server_id,
            r.server_type,
            r.real_path,
            r.sync_state,
            r.md5,
            r.sm3,
            r.is_full_text,
            r.zone,
            r.is_file_pdf,
            r.is_public,
            r.composite_status,
            r.check_status,
            r.file_status,
            r.update_md5,
            r.sync_flag,
            r.process_state,
            r.has_metadata,
            r.is_classified,
        ],
    )?;
    Ok(())
}
