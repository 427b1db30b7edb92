pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{CaseContext, CaseState};
pub use error::{CaseError, CaseWarning};
pub use progress::{LogProgress, NoopProgress, ProgressReporter, ProgressSnapshot, ProgressTracker};
pub use runner::{AssemblyPlan, CaseOrchestrator, ProcessType};
