use std::path::PathBuf;

use crate::config::{Config, RecordDefaults, SourceAction};

pub struct PipelineConfig {
    pub image_root: PathBuf,
    pub storage_root: PathBuf,
    pub backup_root: Option<PathBuf>,
    pub source_action: SourceAction,
    pub inner_dir_name: String,
    pub max_per_dir: usize,
    pub record_defaults: RecordDefaults,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            image_root: config.files.image_root.clone(),
            storage_root: config.files.storage_root.clone(),
            backup_root: config.files.backup_root.clone(),
            source_action: config.files.source_action,
            inner_dir_name: config.files.inner_dir_name.clone(),
            max_per_dir: config.storage.max_per_dir,
            record_defaults: config.record_defaults.clone(),
        }
    }
}
