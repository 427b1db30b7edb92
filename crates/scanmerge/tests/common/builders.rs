//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use scanmerge::config::{
    Config, DatabaseConfig, FilesConfig, LogConfig, RecordDefaults, SourceAction, StorageConfig,
    TableNames,
};

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    database_path: PathBuf,
    tables: TableNames,
    image_root: PathBuf,
    storage_root: PathBuf,
    backup_root: Option<PathBuf>,
    source_action: SourceAction,
    inner_dir_name: String,
    max_per_dir: usize,
    concurrency: usize,
}

impl ConfigBuilder {
    /// Create a new builder rooted at `base` with sensible defaults for testing.
    pub fn new(base: &Path) -> Self {
        Self {
            database_path: base.join("archive.db"),
            tables: TableNames::default(),
            image_root: base.join("images"),
            storage_root: base.join("pdf"),
            backup_root: Some(base.join("backup")),
            source_action: SourceAction::Keep,
            inner_dir_name: "内部".to_string(),
            max_per_dir: 1000,
            concurrency: 2,
        }
    }

    pub fn source_action(mut self, action: SourceAction) -> Self {
        self.source_action = action;
        self
    }

    pub fn max_per_dir(mut self, max: usize) -> Self {
        self.max_per_dir = max;
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    pub fn inner_dir_name(mut self, name: &str) -> Self {
        self.inner_dir_name = name.to_string();
        self
    }

    pub fn build(self) -> Config {
        Config {
            version: "1.0".to_string(),
            database: DatabaseConfig {
                path: self.database_path,
                tables: self.tables,
            },
            files: FilesConfig {
                image_root: self.image_root,
                storage_root: self.storage_root,
                backup_root: self.backup_root,
                source_action: self.source_action,
                inner_dir_name: self.inner_dir_name,
            },
            storage: StorageConfig {
                max_per_dir: self.max_per_dir,
            },
            concurrency: self.concurrency,
            progress_interval_secs: 1,
            log: LogConfig::default(),
            record_defaults: RecordDefaults::default(),
        }
    }
}

/// One work-list row plus its detail row.
#[derive(Debug, Clone)]
pub struct CaseSeed {
    pub case_id: String,
    pub archive_code: String,
    pub process_type: i64,
    pub relocate_source: bool,
    pub image_set: Option<String>,
    pub sub_project: Option<String>,
    pub project: Option<String>,
    pub with_detail: bool,
}

impl CaseSeed {
    pub fn new(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            archive_code: format!("AR-{}", case_id),
            process_type: 1,
            relocate_source: false,
            image_set: Some("batch-01".to_string()),
            sub_project: Some("SP-1".to_string()),
            project: Some("P-1".to_string()),
            with_detail: true,
        }
    }

    pub fn process_type(mut self, process_type: i64) -> Self {
        self.process_type = process_type;
        self
    }

    pub fn relocate(mut self) -> Self {
        self.relocate_source = true;
        self
    }

    pub fn image_set(mut self, set: &str) -> Self {
        self.image_set = Some(set.to_string());
        self
    }

    pub fn without_detail(mut self) -> Self {
        self.with_detail = false;
        self
    }
}
