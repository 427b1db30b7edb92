//! Tracing subscriber setup for the batch binary.
//!
//! `log` records emitted by the persistence and worker layers are bridged
//! into the same subscriber, so one filter and one destination cover both.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::error::ConfigError;

const DEFAULT_LOG_FILTER: &str = "scanmerge=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(config: &LogConfig) -> Result<(), ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, ansi) = match &config.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::LogDestination {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::LogDestination {
                    path: path.clone(),
                    source: e,
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
