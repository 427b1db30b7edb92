use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanmergeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Assembly error: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Failed to decode config: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to open log destination '{path}': {source}")]
    LogDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read storage root '{path}': {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read shard directory '{path}': {source}")]
    ReadShard {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory '{path}': {source}")]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move '{from}' to '{to}': {source}")]
    MoveDirectory {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path '{path}' is not inside image root '{root}'")]
    OutsideImageRoot { path: PathBuf, root: PathBuf },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Backup root is not configured")]
    MissingBackupRoot,

    #[error("Shard state lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Failed to read image directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No images found in '{path}'")]
    EmptyImageSet { path: PathBuf },

    #[error("Failed to open image '{path}': {source}")]
    OpenImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to draw image '{path}': {reason}")]
    DrawImage { path: PathBuf, reason: String },

    #[error("Failed to write PDF '{path}': {reason}")]
    WritePdf { path: PathBuf, reason: String },

    #[error("Failed to read back PDF '{path}': {source}")]
    ReadBack {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AssembleError {
    /// True when the directory held no qualifying images at all.
    pub fn is_empty_image_set(&self) -> bool {
        matches!(self, AssembleError::EmptyImageSet { .. })
    }
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to remove document folder '{path}': {source}")]
    RemoveFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ScanmergeError>;
