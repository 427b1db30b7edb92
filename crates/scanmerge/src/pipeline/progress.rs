use std::fmt;
use std::sync::Mutex;

use crate::storage::ShardSnapshot;

/// Batch progress at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub shard: Option<ShardSnapshot>,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%)",
            self.processed,
            self.total,
            self.percent()
        )?;
        if let Some(shard) = &self.shard {
            write!(
                f,
                " shard {} ({}/{})",
                shard.shard, shard.folder_count, shard.capacity
            )?;
        }
        Ok(())
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, snapshot: &ProgressSnapshot);

    /// Called once after the last case finished.
    fn finish(&self, snapshot: &ProgressSnapshot) {
        self.report(snapshot);
    }
}

/// Writes progress lines to the log.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, snapshot: &ProgressSnapshot) {
        log::info!("Progress: {}", snapshot);
    }

    fn finish(&self, snapshot: &ProgressSnapshot) {
        log::info!("Finished: {}", snapshot);
    }
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _snapshot: &ProgressSnapshot) {}
}

/// Shared count of cases that reached a terminal state.
pub struct ProgressTracker {
    total: usize,
    processed: Mutex<usize>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: Mutex::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn increment(&self) {
        match self.processed.lock() {
            Ok(mut processed) => *processed += 1,
            Err(_) => log::error!("Progress counter lock poisoned; count not updated"),
        }
    }

    pub fn processed(&self) -> usize {
        match self.processed.lock() {
            Ok(processed) => *processed,
            Err(poisoned) => {
                log::warn!("Progress counter lock poisoned; reporting last value");
                *poisoned.into_inner()
            }
        }
    }

    pub fn snapshot(&self, shard: Option<ShardSnapshot>) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed(),
            total: self.total,
            shard,
        }
    }
}
