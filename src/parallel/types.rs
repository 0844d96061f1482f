//! Type definitions for parallel processing
//!
//! Contains the pool configuration, worker reports and the shared abort state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::AggregatorConfig;
use crate::error::AggError;
use crate::stats::WorkerStats;

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub num_workers: usize,
    /// Chunks that may wait in the queue on top of the one each worker holds
    pub queue_capacity: usize,
    pub deadline: Option<Duration>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            queue_capacity: crate::config::DEFAULT_PENDING_CHUNKS,
            deadline: None,
        }
    }
}

impl From<&AggregatorConfig> for ParallelConfig {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            num_workers: config.effective_pool_size(),
            queue_capacity: config.queue_capacity(),
            deadline: config.performance.deadline,
        }
    }
}

/// Sent by each worker once its queue is closed and drained
#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub worker_id: usize,
    pub stats: WorkerStats,
}

/// Sent by the reader thread once the source is exhausted
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ReaderReport {
    pub records_read: u64,
    pub chunks_dispatched: usize,
}

/// First-failure-wins abort flag shared by the dispatcher and the workers
#[derive(Debug, Clone, Default)]
pub(crate) struct RunControl {
    aborted: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<AggError>>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the failure slot with poison recovery
    fn lock_failure(&self) -> MutexGuard<'_, Option<AggError>> {
        match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering failure slot");
                poisoned.into_inner()
            }
        }
    }

    /// Record `err` unless an earlier failure is already recorded, and stop the run
    pub fn abort(&self, err: AggError) {
        let mut failure = self.lock_failure();
        if failure.is_none() {
            *failure = Some(err);
        }
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn take_failure(&self) -> Option<AggError> {
        self.lock_failure().take()
    }
}
