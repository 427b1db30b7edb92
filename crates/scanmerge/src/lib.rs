pub mod assembler;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod recorder;
pub mod storage;
pub mod worker;

pub use assembler::{CompositeDocument, DocumentAssembler, Zone};
pub use config::{load_config, Config};
pub use db::Database;
pub use error::{
    AssembleError, ConfigError, RecordError, Result, ScanmergeError, StorageError, WorkerError,
};
pub use logging::init_logging;
pub use pipeline::{CaseError, CaseOrchestrator, PipelineConfig};
pub use recorder::{ArchivalRecord, MetadataRecorder};
pub use storage::{ShardAllocator, SourceDisposer};
pub use worker::{run_batch, RunSummary, Scheduler};
