pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, validate_config, SAMPLE_CONFIG};
pub use schema::{
    Config, DatabaseConfig, FilesConfig, LogConfig, LogFormat, RecordDefaults, SourceAction,
    StorageConfig, TableNames,
};
