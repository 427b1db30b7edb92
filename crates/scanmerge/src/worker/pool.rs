use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::db::case_repo::{self, CaseInput};
use crate::error::WorkerError;
use crate::pipeline::{CaseOrchestrator, ProgressTracker};
use crate::worker::job::CaseReport;

/// Fixed-size pool of case workers fed through a rendezvous channel.
///
/// The channel has no buffer: `submit` returns once an idle worker has taken
/// the case and blocks while every worker is busy.
pub struct WorkerPool {
    case_sender: Sender<CaseInput>,
    report_receiver: Receiver<CaseReport>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(
        orchestrator: Arc<CaseOrchestrator>,
        worker_count: usize,
        tracker: Arc<ProgressTracker>,
    ) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        let (case_sender, case_receiver) = bounded::<CaseInput>(0);
        let (report_sender, report_receiver) = unbounded::<CaseReport>();

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let case_rx = case_receiver.clone();
            let report_tx = report_sender.clone();
            let worker_orchestrator = Arc::clone(&orchestrator);
            let worker_tracker = Arc::clone(&tracker);

            let handle = thread::Builder::new()
                .name(format!("case-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        case_rx,
                        report_tx,
                        worker_orchestrator,
                        worker_tracker,
                    );
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            case_sender,
            report_receiver,
            workers,
        })
    }

    /// Hands a case to the next free worker, blocking while all are busy.
    pub fn submit(&self, case: CaseInput) -> Result<(), WorkerError> {
        self.case_sender
            .send(case)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Closes the queue, waits for every worker and returns all reports.
    pub fn wait(self) -> Vec<CaseReport> {
        // Drop sender to signal workers to exit
        drop(self.case_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
        self.report_receiver.iter().collect()
    }
}

fn run_worker(
    worker_id: usize,
    case_receiver: Receiver<CaseInput>,
    report_sender: Sender<CaseReport>,
    orchestrator: Arc<CaseOrchestrator>,
    tracker: Arc<ProgressTracker>,
) {
    debug!("Worker {} started", worker_id);

    for case in case_receiver.iter() {
        debug!("Worker {} processing case {}", worker_id, case.case_id);

        let report = run_case(&orchestrator, &case);
        tracker.increment();

        if let Err(e) = report_sender.send(report) {
            error!("Worker {} failed to send report: {}", worker_id, e);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs one case to a terminal state. Errors and panics both end with the
/// case marked failed; neither escapes to the caller.
pub fn run_case(orchestrator: &CaseOrchestrator, case: &CaseInput) -> CaseReport {
    let result = panic::catch_unwind(AssertUnwindSafe(|| orchestrator.process(case)));

    let (reason, severe) = match result {
        Ok(Ok(ctx)) => return CaseReport::success(&ctx),
        Ok(Err(e)) => {
            let reason = e.reason();
            if e.is_severe() {
                tracing::error!(
                    case_id = %case.case_id,
                    severe = true,
                    error = %reason,
                    "Source images disposed but case outcome not stored"
                );
            } else {
                tracing::warn!(case_id = %case.case_id, error = %reason, "Case failed");
            }
            (reason, e.is_severe())
        }
        Err(payload) => {
            let reason = format!("panicked: {}", panic_message(payload.as_ref()));
            tracing::error!(case_id = %case.case_id, error = %reason, "Case worker panicked");
            (reason, false)
        }
    };

    if let Err(e) = case_repo::mark_failed(orchestrator.database(), &case.case_id, &reason) {
        error!("Failed to record failure of case {}: {}", case.case_id, e);
    }

    CaseReport::failure(&case.case_id, reason, severe)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
