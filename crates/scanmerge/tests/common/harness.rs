//! Test harness for isolated batch runs.
//!
//! The `TestHarness` struct provides a complete isolated environment:
//! - Temporary image, storage and backup roots
//! - An on-disk SQLite store with the default table names
//! - Fixture image writers using the `image` encoders

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rusqlite::params;
use tempfile::TempDir;

use scanmerge::config::{Config, SourceAction};
use scanmerge::db::case_repo::{self, Outcome};
use scanmerge::db::record_repo::{self, ArtifactRow, RecordRow};
use scanmerge::Database;

use super::builders::{CaseSeed, ConfigBuilder};

pub struct TestHarness {
    temp_dir: TempDir,
    pub image_root: PathBuf,
    pub storage_root: PathBuf,
    pub backup_root: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let image_root = base.join("images");
        let storage_root = base.join("pdf");
        let backup_root = base.join("backup");
        std::fs::create_dir_all(&image_root).expect("Failed to create image root");
        std::fs::create_dir_all(&storage_root).expect("Failed to create storage root");

        let config = ConfigBuilder::new(base).build();
        let db = Database::open(&config.database.path, config.database.tables.clone())
            .expect("Failed to open test database");

        Self {
            temp_dir,
            image_root,
            storage_root,
            backup_root,
            db,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config pointing at this harness's directories and store.
    pub fn config(&self, action: SourceAction) -> Config {
        ConfigBuilder::new(self.temp_path())
            .source_action(action)
            .build()
    }

    pub fn config_builder(&self) -> ConfigBuilder {
        ConfigBuilder::new(self.temp_path())
    }

    /// Inserts the work-list row and, unless disabled, the detail row.
    pub fn seed_case(&self, seed: &CaseSeed) {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO file_input (case_id, archive_code, process_type,
                     relocate_source, image_set) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        seed.case_id,
                        seed.archive_code,
                        seed.process_type,
                        seed.relocate_source as i64,
                        seed.image_set
                    ],
                )?;
                if seed.with_detail {
                    conn.execute(
                        "INSERT INTO eam_file (case_id, archive_code, sub_project, project,
                         image_set) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            seed.case_id,
                            seed.archive_code,
                            seed.sub_project,
                            seed.project,
                            seed.image_set
                        ],
                    )?;
                }
                Ok(())
            })
            .expect("Failed to seed case");
    }

    /// `image_root/<image set>/<case_id>`.
    pub fn case_dir(&self, seed: &CaseSeed) -> PathBuf {
        let mut dir = self.image_root.clone();
        if let Some(set) = &seed.image_set {
            dir.push(set);
        }
        dir.join(&seed.case_id)
    }

    /// Writes small valid JPEG or PNG files (by extension) into `dir`.
    pub fn write_images(&self, dir: &Path, names: &[&str]) {
        std::fs::create_dir_all(dir).expect("Failed to create image dir");
        for (i, name) in names.iter().enumerate() {
            let width = 20 + i as u32 * 3;
            RgbImage::from_pixel(width, 30, Rgb([90, 160, 30]))
                .save(dir.join(name))
                .expect("Failed to write fixture image");
        }
    }

    /// Writes a file with an image extension whose content is not an image.
    pub fn write_damaged(&self, dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).expect("Failed to create image dir");
        std::fs::write(dir.join(name), b"\x00\x01 definitely not a picture")
            .expect("Failed to write damaged image");
    }

    pub fn outcome(&self, case_id: &str) -> (Outcome, Option<String>) {
        case_repo::find_outcome(&self.db, case_id)
            .expect("Failed to read outcome")
            .expect("Case not found")
    }

    pub fn records(&self, case_id: &str) -> Vec<RecordRow> {
        record_repo::find_by_case(&self.db, case_id).expect("Failed to read records")
    }

    pub fn artifacts(&self, case_id: &str) -> Vec<ArtifactRow> {
        record_repo::find_artifacts(&self.db, case_id).expect("Failed to read artifacts")
    }

    pub fn detail_image_set(&self, case_id: &str) -> Option<String> {
        case_repo::find_detail(&self.db, case_id)
            .expect("Failed to read detail")
            .expect("Detail not found")
            .image_set
    }

    /// Number of document folders across all shards.
    pub fn document_folders(&self) -> usize {
        let mut count = 0;
        for shard in std::fs::read_dir(&self.storage_root).expect("Failed to read storage root") {
            let source = shard.expect("Bad shard entry").path().join("source");
            if let Ok(entries) = std::fs::read_dir(source) {
                count += entries.count();
            }
        }
        count
    }
}
