use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::assembler::{DocumentAssembler, Zone};
use crate::config::SourceAction;
use crate::db::case_repo::{self, CaseDetail, CaseInput};
use crate::db::Database;
use crate::recorder::MetadataRecorder;
use crate::storage::{ShardAllocator, SourceDisposer};

use super::config::PipelineConfig;
use super::context::{CaseContext, CaseState};
use super::error::{CaseError, CaseWarning};

/// The process-type flag on the work list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    /// Nothing to assemble; only source disposal and the outcome update run.
    NoAssembly = 0,
    SingleZone = 1,
    DualZone = 2,
}

impl ProcessType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ProcessType::NoAssembly),
            1 => Some(ProcessType::SingleZone),
            2 => Some(ProcessType::DualZone),
            _ => None,
        }
    }
}

/// Which zones of a case get assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPlan {
    NoAssembly,
    SingleZone,
    DualZone { inner_present: bool },
}

impl AssemblyPlan {
    /// Decides the plan from the process type and, for dual-zone cases,
    /// whether the inner sub-directory exists.
    pub fn decide(
        process_type: i64,
        image_dir: &Path,
        inner_dir_name: &str,
    ) -> Result<Self, CaseError> {
        match ProcessType::from_code(process_type) {
            Some(ProcessType::NoAssembly) => Ok(AssemblyPlan::NoAssembly),
            Some(ProcessType::SingleZone) => Ok(AssemblyPlan::SingleZone),
            Some(ProcessType::DualZone) => Ok(AssemblyPlan::DualZone {
                inner_present: image_dir.join(inner_dir_name).is_dir(),
            }),
            None => Err(CaseError::UnsupportedProcessType(process_type)),
        }
    }
}

/// Runs one case end to end: cleanup, assembly, bookkeeping, source
/// disposal and the success update.
pub struct CaseOrchestrator {
    config: Arc<PipelineConfig>,
    db: Database,
    assembler: DocumentAssembler,
    recorder: MetadataRecorder,
    disposer: SourceDisposer,
}

impl CaseOrchestrator {
    pub fn from_config(
        config: Arc<PipelineConfig>,
        db: Database,
        allocator: Arc<ShardAllocator>,
    ) -> Self {
        let assembler = DocumentAssembler::new(allocator);
        let recorder = MetadataRecorder::new(db.clone(), config.record_defaults.clone());
        let disposer = SourceDisposer::new(
            &config.image_root,
            config.backup_root.clone(),
            config.source_action,
        );

        Self {
            config,
            db,
            assembler,
            recorder,
            disposer,
        }
    }

    pub fn allocator(&self) -> &Arc<ShardAllocator> {
        self.assembler.allocator()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Processes one case. On error nothing is written to the work list;
    /// the caller records the failure.
    pub fn process(&self, case: &CaseInput) -> Result<CaseContext, CaseError> {
        let _case_span = info_span!("case",
            case_id = %case.case_id,
            process_type = case.process_type,
        )
        .entered();

        let mut ctx = CaseContext::new(case.clone());

        let detail = {
            let _step = info_span!("fetch_detail").entered();
            self.step_fetch_detail(&mut ctx)?
        };

        {
            let _step = info_span!("cleanup").entered();
            ctx.state = CaseState::Cleaning;
            self.step_cleanup(&mut ctx)?;
        }

        {
            let _step = info_span!("assemble").entered();
            ctx.state = CaseState::Assembling;
            self.step_assemble(&mut ctx, &detail)?;
        }

        {
            let _step = info_span!("dispose").entered();
            ctx.state = CaseState::Disposing;
            self.step_dispose_and_finish(&mut ctx)?;
        }

        ctx.state = CaseState::Succeeded;
        info!(
            documents = ctx.documents.len(),
            warnings = ctx.warnings.len(),
            "Case succeeded"
        );
        Ok(ctx)
    }

    fn step_fetch_detail(&self, ctx: &mut CaseContext) -> Result<CaseDetail, CaseError> {
        let detail = case_repo::find_detail(&self.db, &ctx.case.case_id)
            .map_err(CaseError::DetailLookup)?
            .ok_or_else(|| CaseError::DetailMissing {
                case_id: ctx.case.case_id.clone(),
            })?;

        ctx.image_dir = Some(self.image_dir(&ctx.case, &detail));
        ctx.detail = Some(detail.clone());
        Ok(detail)
    }

    /// `image_root/<image set>/<case_id>`. The detail row's image-set
    /// reference wins over the work list's.
    fn image_dir(&self, case: &CaseInput, detail: &CaseDetail) -> PathBuf {
        let mut dir = self.config.image_root.clone();
        if let Some(set) = detail
            .image_set
            .as_deref()
            .or(case.image_set.as_deref())
            .filter(|s| !s.is_empty())
        {
            dir.push(set);
        }
        dir.push(&case.case_id);
        dir
    }

    fn step_cleanup(&self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        ctx.removed_records = self
            .recorder
            .cleanup(&ctx.case.case_id)
            .map_err(CaseError::Cleanup)?;
        Ok(())
    }

    fn step_assemble(&self, ctx: &mut CaseContext, detail: &CaseDetail) -> Result<(), CaseError> {
        let image_dir = ctx.image_dir.clone().unwrap_or_default();
        let plan = AssemblyPlan::decide(
            ctx.case.process_type,
            &image_dir,
            &self.config.inner_dir_name,
        )?;
        ctx.plan = Some(plan);
        debug!(?plan, image_dir = %image_dir.display(), "Assembly plan decided");

        match plan {
            AssemblyPlan::NoAssembly => {}
            AssemblyPlan::SingleZone | AssemblyPlan::DualZone { inner_present: false } => {
                self.build_zone(ctx, detail, Zone::Outer, &image_dir)?;
            }
            AssemblyPlan::DualZone { inner_present: true } => {
                match self.build_zone(ctx, detail, Zone::Outer, &image_dir) {
                    Ok(()) => {}
                    Err(CaseError::Assemble {
                        zone: Zone::Outer,
                        source,
                    }) if source.is_empty_image_set() => {
                        warn!(path = %image_dir.display(), "Outer zone has no images");
                        ctx.warnings.push(CaseWarning::EmptyOuterZone {
                            path: image_dir.clone(),
                        });
                    }
                    Err(e) => return Err(e),
                }
                let inner_dir = image_dir.join(&self.config.inner_dir_name);
                self.build_zone(ctx, detail, Zone::Inner, &inner_dir)?;
            }
        }
        Ok(())
    }

    /// Assembles one zone and records it before anything else happens.
    fn build_zone(
        &self,
        ctx: &mut CaseContext,
        detail: &CaseDetail,
        zone: Zone,
        dir: &Path,
    ) -> Result<(), CaseError> {
        ctx.state = CaseState::Assembling;
        let document = self
            .assembler
            .assemble(&ctx.case.case_id, zone, dir)
            .map_err(|source| CaseError::Assemble { zone, source })?;

        ctx.state = CaseState::Recording;
        let record = match self.recorder.insert(&document, detail) {
            Ok(record) => record,
            Err(source) => {
                // The artifact row rolled back with the record; nothing else points here.
                discard_folder(&document.storage_dir);
                return Err(CaseError::Record { zone, source });
            }
        };

        ctx.documents.push(document);
        ctx.records.push(record);
        Ok(())
    }

    fn step_dispose_and_finish(&self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        let case_id = ctx.case.case_id.clone();
        let disposes = ctx.case.relocate_source && self.disposer.action() != SourceAction::Keep;

        if !disposes {
            if ctx.case.relocate_source {
                debug!("Source action is keep; leaving images in place");
            }
            return case_repo::mark_succeeded(&self.db, &case_id, false)
                .map_err(CaseError::MarkSucceeded);
        }

        let image_dir = ctx.image_dir.clone().unwrap_or_default();
        ctx.disposed_to = self
            .disposer
            .dispose(&image_dir)
            .map_err(|source| CaseError::Dispose {
                path: image_dir.clone(),
                source,
            })?;

        case_repo::mark_succeeded(&self.db, &case_id, true)
            .map_err(CaseError::OutcomeAfterDisposal)
    }
}

/// Removes a document folder that never made it into the artifact index.
fn discard_folder(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %dir.display(),
            error = %e,
            "Failed to remove unrecorded document folder"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RecordDefaults, TableNames};
    use crate::db::case_repo::Outcome;
    use crate::db::record_repo;
    use image::{Rgb, RgbImage};
    use rusqlite::params;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        image_root: PathBuf,
        storage_root: PathBuf,
        backup_root: PathBuf,
        db: Database,
    }

    fn setup() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let image_root = tmp.path().join("images");
        let storage_root = tmp.path().join("pdf");
        let backup_root = tmp.path().join("backup");
        std::fs::create_dir_all(&image_root).unwrap();
        std::fs::create_dir_all(&storage_root).unwrap();
        let db = Database::open_in_memory(TableNames::default()).unwrap();
        Fixture {
            _tmp: tmp,
            image_root,
            storage_root,
            backup_root,
            db,
        }
    }

    fn orchestrator(f: &Fixture, action: SourceAction) -> CaseOrchestrator {
        let config = Arc::new(PipelineConfig {
            image_root: f.image_root.clone(),
            storage_root: f.storage_root.clone(),
            backup_root: Some(f.backup_root.clone()),
            source_action: action,
            inner_dir_name: "内部".to_string(),
            max_per_dir: 100,
            record_defaults: RecordDefaults::default(),
        });
        let allocator = Arc::new(ShardAllocator::open(&f.storage_root, 100).unwrap());
        CaseOrchestrator::from_config(config, f.db.clone(), allocator)
    }

    fn seed(f: &Fixture, case_id: &str, process_type: i64, relocate: bool) -> CaseInput {
        f.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO file_input (case_id, archive_code, process_type, relocate_source,
                 image_set) VALUES (?1, 'AR-7', ?2, ?3, 'set1')",
                params![case_id, process_type, relocate as i64],
            )?;
            conn.execute(
                "INSERT INTO eam_file (case_id, archive_code, sub_project, project, image_set)
                 VALUES (?1, 'AR-7', 'SP', 'P', 'set1')",
                params![case_id],
            )?;
            Ok(())
        })
        .unwrap();
        case_repo::fetch_pending(&f.db)
            .unwrap()
            .into_iter()
            .find(|c| c.case_id == case_id)
            .unwrap()
    }

    fn write_images(dir: &Path, names: &[&str]) {
        std::fs::create_dir_all(dir).unwrap();
        for name in names {
            RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    #[test]
    fn test_plan_decision() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("inner")).unwrap();

        assert_eq!(
            AssemblyPlan::decide(0, tmp.path(), "inner").unwrap(),
            AssemblyPlan::NoAssembly
        );
        assert_eq!(
            AssemblyPlan::decide(1, tmp.path(), "inner").unwrap(),
            AssemblyPlan::SingleZone
        );
        assert_eq!(
            AssemblyPlan::decide(2, tmp.path(), "inner").unwrap(),
            AssemblyPlan::DualZone {
                inner_present: true
            }
        );
        assert_eq!(
            AssemblyPlan::decide(2, tmp.path(), "missing").unwrap(),
            AssemblyPlan::DualZone {
                inner_present: false
            }
        );
        assert!(matches!(
            AssemblyPlan::decide(5, tmp.path(), "inner"),
            Err(CaseError::UnsupportedProcessType(5))
        ));
    }

    #[test]
    fn test_single_zone_case() {
        let f = setup();
        let case = seed(&f, "c1", 1, false);
        write_images(&f.image_root.join("set1").join("c1"), &["1.jpg", "2.jpg", "3.png"]);

        let ctx = orchestrator(&f, SourceAction::Keep).process(&case).unwrap();

        assert_eq!(ctx.state, CaseState::Succeeded);
        assert_eq!(ctx.plan, Some(AssemblyPlan::SingleZone));
        assert_eq!(ctx.records.len(), 1);
        assert_eq!(ctx.records[0].page_count, 3);
        assert_eq!(ctx.records[0].zone, 1);
        assert_eq!(ctx.records[0].label, "AR-7-001");
        assert_eq!(
            case_repo::find_outcome(&f.db, "c1").unwrap().unwrap().0,
            Outcome::Succeeded
        );
    }

    #[test]
    fn test_dual_zone_empty_outer_is_soft() {
        let f = setup();
        let case = seed(&f, "c1", 2, false);
        let dir = f.image_root.join("set1").join("c1");
        write_images(&dir.join("内部"), &["1.jpg", "2.jpg"]);

        let ctx = orchestrator(&f, SourceAction::Keep).process(&case).unwrap();

        assert_eq!(ctx.warnings, vec![CaseWarning::EmptyOuterZone { path: dir }]);
        assert_eq!(ctx.records.len(), 1);
        assert_eq!(ctx.records[0].zone, 2);
        assert_eq!(ctx.records[0].seq_no, 1);
    }

    #[test]
    fn test_dual_zone_empty_inner_is_hard() {
        let f = setup();
        let case = seed(&f, "c1", 2, false);
        let dir = f.image_root.join("set1").join("c1");
        write_images(&dir, &["1.jpg"]);
        std::fs::create_dir_all(dir.join("内部")).unwrap();

        let err = orchestrator(&f, SourceAction::Keep)
            .process(&case)
            .unwrap_err();

        assert!(matches!(
            err,
            CaseError::Assemble {
                zone: Zone::Inner,
                ..
            }
        ));
        // The outer record was committed before the inner zone failed.
        assert_eq!(record_repo::find_by_case(&f.db, "c1").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_detail_fails() {
        let f = setup();
        let case = CaseInput {
            case_id: "ghost".to_string(),
            archive_code: "X".to_string(),
            process_type: 1,
            relocate_source: false,
            image_set: None,
        };
        let err = orchestrator(&f, SourceAction::Keep)
            .process(&case)
            .unwrap_err();
        assert!(matches!(err, CaseError::DetailMissing { .. }));
        assert_eq!(err.state(), CaseState::Pending);
    }

    #[test]
    fn test_unsupported_process_type_fails() {
        let f = setup();
        let case = seed(&f, "c1", 9, false);
        let err = orchestrator(&f, SourceAction::Keep)
            .process(&case)
            .unwrap_err();
        assert!(err.reason().contains("Unsupported process type 9"));
    }

    #[test]
    fn test_no_assembly_still_disposes() {
        let f = setup();
        let case = seed(&f, "c1", 0, true);
        let dir = f.image_root.join("set1").join("c1");
        write_images(&dir, &["1.jpg"]);

        let ctx = orchestrator(&f, SourceAction::Delete)
            .process(&case)
            .unwrap();

        assert!(ctx.records.is_empty());
        assert!(!dir.exists());
        let detail = case_repo::find_detail(&f.db, "c1").unwrap().unwrap();
        assert!(detail.image_set.is_none());
    }

    #[test]
    fn test_rerun_replaces_previous_documents() {
        let f = setup();
        let case = seed(&f, "c1", 1, false);
        write_images(&f.image_root.join("set1").join("c1"), &["1.jpg", "2.jpg"]);
        let orchestrator = orchestrator(&f, SourceAction::Keep);

        let first = orchestrator.process(&case).unwrap();
        let second = orchestrator.process(&case).unwrap();

        assert_eq!(second.removed_records, 1);
        assert!(!first.documents[0].storage_dir.exists());
        assert!(second.documents[0].file_path.exists());
        let records = record_repo::find_by_case(&f.db, "c1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq_no, 1);
    }

    fn document_folders(storage_root: &Path) -> usize {
        std::fs::read_dir(storage_root)
            .unwrap()
            .filter_map(|shard| std::fs::read_dir(shard.unwrap().path().join("source")).ok())
            .map(|entries| entries.count())
            .sum()
    }

    #[test]
    fn test_failed_insert_removes_unrecorded_folder() {
        let f = setup();
        let case = seed(&f, "c1", 1, false);
        write_images(&f.image_root.join("set1").join("c1"), &["1.jpg"]);
        f.db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_records BEFORE INSERT ON eam_record
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .unwrap();
        let orchestrator = orchestrator(&f, SourceAction::Keep);

        let err = orchestrator.process(&case).unwrap_err();
        assert!(matches!(err, CaseError::Record { zone: Zone::Outer, .. }));
        assert_eq!(err.state(), CaseState::Recording);
        assert_eq!(document_folders(&f.storage_root), 0);

        f.db.with_conn(|conn| {
            conn.execute_batch("DROP TRIGGER reject_records;")?;
            Ok(())
        })
        .unwrap();
        orchestrator.process(&case).unwrap();

        assert_eq!(record_repo::find_by_case(&f.db, "c1").unwrap().len(), 1);
        assert_eq!(document_folders(&f.storage_root), 1);
    }
}
