use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub database: DatabaseConfig,
    pub files: FilesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub record_defaults: RecordDefaults,
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

fn default_progress_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
    #[serde(default)]
    pub tables: TableNames,
}

/// Names of the four tables the batch reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    /// Work list: one row per case with its outcome.
    #[serde(default = "default_input_table")]
    pub input: String,
    /// Case details: archive codes and image-set location.
    #[serde(default = "default_detail_table")]
    pub detail: String,
    /// Archival records, one per composite document.
    #[serde(default = "default_record_table")]
    pub record: String,
    /// Storage folders of previously written documents, keyed by record.
    #[serde(default = "default_artifact_table")]
    pub artifact: String,
}

fn default_input_table() -> String {
    "file_input".to_string()
}

fn default_detail_table() -> String {
    "eam_file".to_string()
}

fn default_record_table() -> String {
    "eam_record".to_string()
}

fn default_artifact_table() -> String {
    "input_pdf".to_string()
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            input: default_input_table(),
            detail: default_detail_table(),
            record: default_record_table(),
            artifact: default_artifact_table(),
        }
    }
}

impl TableNames {
    pub fn all(&self) -> [&str; 4] {
        [&self.input, &self.detail, &self.record, &self.artifact]
    }
}

/// Returns true if `name` is safe to splice into SQL as a table name.
pub fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    pub image_root: PathBuf,
    pub storage_root: PathBuf,
    #[serde(default)]
    pub backup_root: Option<PathBuf>,
    #[serde(default)]
    pub source_action: SourceAction,
    /// Sub-directory of a case's image set holding the inner zone.
    #[serde(default = "default_inner_dir_name")]
    pub inner_dir_name: String,
}

fn default_inner_dir_name() -> String {
    "内部".to_string()
}

/// What happens to a case's source images after its documents are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceAction {
    /// Move the image set under the backup root, keeping its relative path.
    Move,
    Delete,
    #[default]
    Keep,
}

impl std::fmt::Display for SourceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceAction::Move => write!(f, "move"),
            SourceAction::Delete => write!(f, "delete"),
            SourceAction::Keep => write!(f, "keep"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Maximum number of document folders placed under one shard.
    #[serde(default = "default_max_per_dir")]
    pub max_per_dir: usize,
}

fn default_max_per_dir() -> usize {
    1000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_per_dir: default_max_per_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file to append to. Logs go to stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Deployment-specific constants written into every archival record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefaults {
    #[serde(default = "default_archives_id")]
    pub archives_id: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_upload_server_id")]
    pub upload_server_id: i64,
    #[serde(default = "default_server_type")]
    pub server_type: i64,
    #[serde(default = "default_real_path")]
    pub real_path: String,
}

fn default_archives_id() -> String {
    "001".to_string()
}

fn default_url() -> String {
    "images".to_string()
}

fn default_upload_server_id() -> i64 {
    4
}

fn default_server_type() -> i64 {
    1
}

fn default_real_path() -> String {
    "J:\\images".to_string()
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            archives_id: default_archives_id(),
            url: default_url(),
            upload_server_id: default_upload_server_id(),
            server_type: default_server_type(),
            real_path: default_real_path(),
        }
    }
}
