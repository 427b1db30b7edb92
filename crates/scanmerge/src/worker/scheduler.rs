//! Batch scheduler: one pass over the pending work list.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Sender};
use log::{error, info};

use crate::config::Config;
use crate::db::{case_repo, Database};
use crate::error::{Result, WorkerError};
use crate::pipeline::{
    CaseOrchestrator, LogProgress, PipelineConfig, ProgressReporter, ProgressTracker,
};
use crate::storage::ShardAllocator;
use crate::worker::job::RunSummary;
use crate::worker::pool::WorkerPool;

pub struct Scheduler {
    orchestrator: Arc<CaseOrchestrator>,
    concurrency: usize,
    progress_interval: Duration,
    reporter: Arc<dyn ProgressReporter>,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<CaseOrchestrator>,
        concurrency: usize,
        progress_interval: Duration,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            orchestrator,
            concurrency,
            progress_interval,
            reporter,
        }
    }

    /// Fetches the work list once and runs every case to a terminal state.
    pub fn run(&self) -> Result<RunSummary> {
        let cases = case_repo::fetch_pending(self.orchestrator.database())?;
        let total = cases.len();
        info!(
            "Fetched {} pending case(s); running with {} worker(s)",
            total, self.concurrency
        );

        let tracker = Arc::new(ProgressTracker::new(total));
        let pool = WorkerPool::new(
            Arc::clone(&self.orchestrator),
            self.concurrency,
            Arc::clone(&tracker),
        )?;
        let monitor = ProgressMonitor::start(
            Arc::clone(&tracker),
            Arc::clone(self.orchestrator.allocator()),
            Arc::clone(&self.reporter),
            self.progress_interval,
        )?;

        let mut dispatch_error = None;
        for case in cases {
            if let Err(e) = pool.submit(case) {
                dispatch_error = Some(e);
                break;
            }
        }

        let reports = pool.wait();
        monitor.stop();

        self.reporter.finish(
            &tracker.snapshot(self.orchestrator.allocator().snapshot().ok()),
        );

        if let Some(e) = dispatch_error {
            return Err(e.into());
        }

        let summary = RunSummary::from_reports(&reports);
        if summary.has_severe() {
            error!(
                "{} case(s) lost their outcome after source disposal",
                summary.severe
            );
        }
        info!("Batch complete: {}", summary);
        Ok(summary)
    }
}

/// Background thread emitting a progress line on every tick.
struct ProgressMonitor {
    done: Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressMonitor {
    fn start(
        tracker: Arc<ProgressTracker>,
        allocator: Arc<ShardAllocator>,
        reporter: Arc<dyn ProgressReporter>,
        interval: Duration,
    ) -> std::result::Result<Self, WorkerError> {
        let (done, done_rx) = crossbeam_channel::bounded::<()>(0);
        let ticker = tick(interval);

        let handle = thread::Builder::new()
            .name("progress-monitor".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        reporter.report(&tracker.snapshot(allocator.snapshot().ok()));
                    }
                    recv(done_rx) -> _ => break,
                }
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok(Self { done, handle })
    }

    fn stop(self) {
        drop(self.done);
        if self.handle.join().is_err() {
            error!("Progress monitor panicked");
        }
    }
}

/// Opens the store and storage root from `config` and runs one batch.
pub fn run_batch(config: &Config) -> Result<RunSummary> {
    let db = Database::open(&config.database.path, config.database.tables.clone())?;
    let allocator = Arc::new(ShardAllocator::open(
        &config.files.storage_root,
        config.storage.max_per_dir,
    )?);

    let pipeline_config = Arc::new(PipelineConfig::from_config(config));
    let orchestrator = Arc::new(CaseOrchestrator::from_config(
        pipeline_config,
        db,
        allocator,
    ));

    Scheduler::new(
        orchestrator,
        config.concurrency,
        Duration::from_secs(config.progress_interval_secs.max(1)),
        Arc::new(LogProgress),
    )
    .run()
}
