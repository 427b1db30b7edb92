pub mod job;
pub mod pool;
pub mod scheduler;

pub use job::{CaseReport, RunSummary};
pub use pool::{run_case, WorkerPool};
pub use scheduler::{run_batch, Scheduler};
