//! Metadata recorder: archival records for composite documents.
//!
//! A case's records are rebuilt from scratch on every run: `cleanup` removes
//! the folders and rows written by earlier runs, then `insert` adds one
//! record per new document.

pub mod record;

use std::io::ErrorKind;
use std::path::Path;

use crate::assembler::CompositeDocument;
use crate::config::RecordDefaults;
use crate::db::case_repo::CaseDetail;
use crate::db::{record_repo, Database};
use crate::error::RecordError;

pub use record::{build_record, ArchivalRecord};

#[derive(Clone)]
pub struct MetadataRecorder {
    db: Database,
    defaults: RecordDefaults,
}

impl MetadataRecorder {
    pub fn new(db: Database, defaults: RecordDefaults) -> Self {
        Self { db, defaults }
    }

    /// Removes every document previously written for `case_id`.
    ///
    /// Folders go first; a folder that cannot be removed (other than already
    /// missing) aborts before the store is touched. Returns the number of
    /// records deleted.
    pub fn cleanup(&self, case_id: &str) -> Result<usize, RecordError> {
        let artifacts = record_repo::find_artifacts(&self.db, case_id)?;
        if artifacts.is_empty() {
            return Ok(0);
        }

        for artifact in &artifacts {
            let folder = Path::new(&artifact.storage_path);
            match std::fs::remove_dir_all(folder) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RecordError::RemoveFolder {
                        path: folder.to_path_buf(),
                        source: e,
                    })
                }
            }
        }

        let ids: Vec<String> = artifacts.into_iter().map(|a| a.record_id).collect();
        let removed = record_repo::delete_records(&self.db, &ids)?;
        log::info!("Removed {} prior record(s) for case {}", removed, case_id);
        Ok(removed)
    }

    /// Writes the archival record for `document` with the next sequence
    /// number of its case.
    pub fn insert(
        &self,
        document: &CompositeDocument,
        detail: &CaseDetail,
    ) -> Result<ArchivalRecord, RecordError> {
        let storage_path = document.storage_dir.to_string_lossy();
        let record = record_repo::insert_with_next_sequence(
            &self.db,
            &document.case_id,
            &storage_path,
            |sequence| build_record(document, detail, &self.defaults, sequence),
        )?;

        log::debug!(
            "Recorded {} for case {} as {} (seq {})",
            record.record_id,
            record.case_id,
            record.label,
            record.seq_no
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Zone;
    use crate::config::TableNames;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn recorder() -> MetadataRecorder {
        let db = Database::open_in_memory(TableNames::default()).unwrap();
        MetadataRecorder::new(db, RecordDefaults::default())
    }

    fn detail() -> CaseDetail {
        CaseDetail {
            case_id: "c1".to_string(),
            archive_code: "A-1".to_string(),
            sub_project: None,
            project: None,
            image_set: None,
        }
    }

    fn document(id: &str, storage_dir: PathBuf) -> CompositeDocument {
        CompositeDocument {
            document_id: id.to_string(),
            case_id: "c1".to_string(),
            zone: Zone::Outer,
            page_count: 1,
            size: 10,
            md5: "m".to_string(),
            sm3: "s".to_string(),
            file_path: storage_dir.join(format!("{}.pdf", id)),
            storage_dir,
            shard: "00000".to_string(),
            damaged: vec![],
            assembled_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_sequential_inserts_number_from_one() {
        let recorder = recorder();
        let first = recorder
            .insert(&document("d1", PathBuf::from("/x/d1")), &detail())
            .unwrap();
        let second = recorder
            .insert(&document("d2", PathBuf::from("/x/d2")), &detail())
            .unwrap();

        assert_eq!(first.seq_no, 1);
        assert_eq!(second.seq_no, 2);
        assert_eq!(second.label, "A-1-002");
    }

    #[test]
    fn test_cleanup_without_history_is_noop() {
        assert_eq!(recorder().cleanup("c1").unwrap(), 0);
    }

    #[test]
    fn test_cleanup_removes_folders_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = recorder();

        let present = temp_dir.path().join("d1");
        std::fs::create_dir_all(&present).unwrap();
        std::fs::write(present.join("d1.pdf"), b"%PDF").unwrap();
        let already_gone = temp_dir.path().join("d2");

        recorder
            .insert(&document("d1", present.clone()), &detail())
            .unwrap();
        recorder
            .insert(&document("d2", already_gone), &detail())
            .unwrap();

        assert_eq!(recorder.cleanup("c1").unwrap(), 2);
        assert!(!present.exists());
        assert!(record_repo::find_by_case(&recorder.db, "c1")
            .unwrap()
            .is_empty());

        // Sequence restarts after cleanup.
        let again = recorder
            .insert(&document("d3", temp_dir.path().join("d3")), &detail())
            .unwrap();
        assert_eq!(again.seq_no, 1);
    }

    #[test]
    fn test_cleanup_stops_before_store_when_folder_removal_fails() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = recorder();

        // A regular file where the folder should be cannot be removed as a directory.
        let blocked = temp_dir.path().join("d1");
        std::fs::write(&blocked, b"not a folder").unwrap();
        recorder
            .insert(&document("d1", blocked.clone()), &detail())
            .unwrap();

        let err = recorder.cleanup("c1").unwrap_err();

        match err {
            RecordError::RemoveFolder { path, .. } => assert_eq!(path, blocked),
            other => panic!("unexpected error: {}", other),
        }
        assert!(blocked.exists());
        assert_eq!(record_repo::find_by_case(&recorder.db, "c1").unwrap().len(), 1);
        assert_eq!(record_repo::find_artifacts(&recorder.db, "c1").unwrap().len(), 1);
    }
}
