//! scanmerge CLI
//!
//! Consolidates pending cases' scanned images into archival PDF documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use scanmerge::config::{validate_config, SAMPLE_CONFIG};
use scanmerge::{init_logging, load_config, run_batch, Config};

/// Exit status when a case lost its outcome after its images were disposed of.
const EXIT_SEVERE: u8 = 2;
const EXIT_FATAL: u8 = 1;

#[derive(Parser)]
#[command(name = "scanmerge", version)]
#[command(about = "Consolidate scanned case images into archival PDFs", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "config.yaml",
        global = true,
        env = "SCANMERGE_CONFIG"
    )]
    config: PathBuf,

    /// Override the number of case workers
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every pending case (default if no command specified)
    Run,

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None | Some(Commands::Run) => run_command(&cli.config, cli.concurrency),
        Some(Commands::Validate) => validate_command(&cli.config, cli.concurrency),
        Some(Commands::GenerateConfig { ref output }) => generate_config_command(output),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn load(config_path: &Path, concurrency: Option<usize>) -> Result<Config> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(c) = concurrency {
        config.concurrency = c;
        validate_config(&config).context("Invalid --concurrency override")?;
    }

    Ok(config)
}

fn run_command(config_path: &Path, concurrency: Option<usize>) -> Result<ExitCode> {
    let config = load(config_path, concurrency)?;
    init_logging(&config.log).context("Failed to initialize logging")?;

    tracing::info!(
        config = %config_path.display(),
        concurrency = config.concurrency,
        "Starting batch"
    );

    let summary = run_batch(&config).context("Batch aborted")?;

    println!("{}", summary);

    if summary.has_severe() {
        eprintln!(
            "{} case(s) had their source images disposed of without a stored outcome; see the log",
            summary.severe
        );
        return Ok(ExitCode::from(EXIT_SEVERE));
    }
    Ok(ExitCode::SUCCESS)
}

fn validate_command(config_path: &Path, concurrency: Option<usize>) -> Result<ExitCode> {
    let config = load(config_path, concurrency)?;

    println!("Configuration is valid.");
    println!();
    println!("Database: {}", config.database.path.display());
    println!("Tables: {}", config.database.tables.all().join(", "));
    println!("Image root: {}", config.files.image_root.display());
    println!("Storage root: {}", config.files.storage_root.display());
    println!("Source action: {}", config.files.source_action);
    println!("Shard capacity: {}", config.storage.max_per_dir);
    println!("Concurrency: {}", config.concurrency);

    Ok(ExitCode::SUCCESS)
}

fn generate_config_command(output: &Path) -> Result<ExitCode> {
    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing file {}", output.display());
    }
    std::fs::write(output, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Sample configuration written to {}", output.display());
    Ok(ExitCode::SUCCESS)
}
