//! Worker thread for parallel processing
//!
//! Contains the worker loop that maps chunks into partial aggregations.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::AggError;
use crate::mapper::Mapper;
use crate::source::Chunk;
use crate::stats::WorkerStats;

use super::sink::ResultSink;
use super::types::{RunControl, WorkerReport};

/// Aborts the run if the worker unwinds out of a mapper
struct PanicGuard<'a> {
    worker_id: usize,
    control: &'a RunControl,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.control.abort(AggError::MapFailure {
                chunk: None,
                record: None,
                reason: format!("worker {} panicked", self.worker_id),
            });
        }
    }
}

/// Worker thread: maps chunks until the queue is closed and drained.
///
/// After an abort, queued chunks are received and dropped unmapped so the
/// dispatcher is never left blocked on a full queue.
pub(crate) fn worker_thread<M: Mapper + ?Sized>(
    worker_id: usize,
    work_receiver: Receiver<Chunk>,
    mapper: Arc<M>,
    sink: ResultSink,
    control: RunControl,
    done_sender: Sender<WorkerReport>,
) {
    let _guard = PanicGuard {
        worker_id,
        control: &control,
    };
    let mut stats = WorkerStats::default();

    while let Ok(chunk) = work_receiver.recv() {
        if control.is_aborted() {
            continue;
        }

        let started = Instant::now();
        match mapper.map(&chunk) {
            Ok(partial) => {
                debug!(
                    worker = worker_id,
                    chunk = chunk.index(),
                    records = chunk.len(),
                    keys = partial.len(),
                    "mapped chunk"
                );
                stats.chunks_mapped += 1;
                stats.records_mapped += chunk.len() as u64;
                sink.submit(partial);
            }
            Err(e) => {
                warn!(worker = worker_id, chunk = chunk.index(), error = %e, "map task failed");
                control.abort(e);
            }
        }
        stats.busy_time += started.elapsed();
    }

    // The coordinator may have stopped listening after a timeout
    let _ = done_sender.send(WorkerReport { worker_id, stats });
}
