//! Case repository: the work list and the case detail table.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Row};

use super::{placeholders, Database, DatabaseError};

/// Processing outcome stored on the work list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending = 1,
    Succeeded = 2,
    Failed = 3,
}

impl Outcome {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Outcome::Pending),
            2 => Some(Outcome::Succeeded),
            3 => Some(Outcome::Failed),
            _ => None,
        }
    }
}

/// One pending case from the work list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInput {
    pub case_id: String,
    pub archive_code: String,
    /// Raw process type; see `pipeline::ProcessType`.
    pub process_type: i64,
    /// Whether source images are disposed of after success.
    pub relocate_source: bool,
    pub image_set: Option<String>,
}

impl CaseInput {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            case_id: row.get("case_id")?,
            archive_code: row.get("archive_code")?,
            process_type: row.get("process_type")?,
            relocate_source: row.get::<_, i64>("relocate_source")? != 0,
            image_set: row.get("image_set")?,
        })
    }
}

/// Descriptive attributes of a case, joined in from the detail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDetail {
    pub case_id: String,
    pub archive_code: String,
    pub sub_project: Option<String>,
    pub project: Option<String>,
    /// Location of the case's image set below the image root.
    pub image_set: Option<String>,
}

impl CaseDetail {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            case_id: row.get("case_id")?,
            archive_code: row.get("archive_code")?,
            sub_project: row.get("sub_project")?,
            project: row.get("project")?,
            image_set: row.get("image_set")?,
        })
    }
}

/// Fetches every pending case. The result is a fixed snapshot for the run.
pub fn fetch_pending(db: &Database) -> Result<Vec<CaseInput>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT case_id, archive_code, process_type, relocate_source, image_set
             FROM {} WHERE outcome = ?1 ORDER BY case_id",
            db.tables().input
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![Outcome::Pending.code()], CaseInput::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Looks up details for a batch of cases, keyed by case id.
pub fn find_details(
    db: &Database,
    case_ids: &[&str],
) -> Result<HashMap<String, CaseDetail>, DatabaseError> {
    if case_ids.is_empty() {
        return Ok(HashMap::new());
    }

    db.with_conn(|conn| {
        let sql = format!(
            "SELECT case_id, archive_code, sub_project, project, image_set
             FROM {} WHERE case_id IN ({})",
            db.tables().detail,
            placeholders(case_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let details = stmt
            .query_map(params_from_iter(case_ids.iter()), CaseDetail::from_row)?
            .map(|r| r.map(|d| (d.case_id.clone(), d)))
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(details)
    })
}

/// Looks up the details of a single case.
pub fn find_detail(db: &Database, case_id: &str) -> Result<Option<CaseDetail>, DatabaseError> {
    let mut details = find_details(db, &[case_id])?;
    Ok(details.remove(case_id))
}

/// Marks a case succeeded. When `clear_image_set` is set, the detail row's
/// image-set reference is cleared in the same transaction.
pub fn mark_succeeded(
    db: &Database,
    case_id: &str,
    clear_image_set: bool,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let updated = tx.execute(
            &format!(
                "UPDATE {} SET outcome = ?2, processed_at = ?3, fail_reason = NULL
                 WHERE case_id = ?1",
                db.tables().input
            ),
            params![case_id, Outcome::Succeeded.code(), super::now_timestamp()],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                table: db.tables().input.clone(),
                case_id: case_id.to_string(),
            });
        }

        if clear_image_set {
            tx.execute(
                &format!(
                    "UPDATE {} SET image_set = NULL WHERE case_id = ?1",
                    db.tables().detail
                ),
                params![case_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    })
}

/// Marks a case failed with a free-text reason.
pub fn mark_failed(db: &Database, case_id: &str, reason: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            &format!(
                "UPDATE {} SET outcome = ?2, processed_at = ?3, fail_reason = ?4
                 WHERE case_id = ?1",
                db.tables().input
            ),
            params![
                case_id,
                Outcome::Failed.code(),
                super::now_timestamp(),
                reason
            ],
        )?;
        Ok(())
    })
}

/// Returns the stored outcome and failure reason of a case.
pub fn find_outcome(
    db: &Database,
    case_id: &str,
) -> Result<Option<(Outcome, Option<String>)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT outcome, fail_reason FROM {} WHERE case_id = ?1",
            db.tables().input
        ))?;
        let mut rows = stmt.query_map(params![case_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })?;
        match rows.next() {
            Some(Ok((code, reason))) => Ok(Outcome::from_code(code).map(|o| (o, reason))),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
