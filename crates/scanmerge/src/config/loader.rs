use std::path::Path;

use crate::config::schema::{is_sql_identifier, Config, SourceAction};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// Annotated configuration written by `scanmerge generate-config`.
pub const SAMPLE_CONFIG: &str = include_str!("../../config.example.yaml");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    // YAML is parsed into a JSON value so the embedded JSON schema applies to it.
    let json_value: serde_json::Value = serde_yaml::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for name in config.database.tables.all() {
        if !is_sql_identifier(name) {
            return Err(ConfigError::Validation {
                message: format!("Invalid table name: '{}'", name),
            });
        }
    }

    if config.storage.max_per_dir == 0 {
        return Err(ConfigError::Validation {
            message: "storage.max_per_dir must be at least 1".to_string(),
        });
    }

    if config.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "concurrency must be at least 1".to_string(),
        });
    }

    if config.progress_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "progress_interval_secs must be at least 1".to_string(),
        });
    }

    if config.files.source_action == SourceAction::Move && config.files.backup_root.is_none() {
        return Err(ConfigError::Validation {
            message: "files.backup_root is required when source_action is 'move'".to_string(),
        });
    }

    let inner = &config.files.inner_dir_name;
    if inner.contains('/') || inner.contains('\\') || inner == "." || inner == ".." {
        return Err(ConfigError::Validation {
            message: format!("files.inner_dir_name must be a plain directory name: '{}'", inner),
        });
    }

    Ok(())
}
