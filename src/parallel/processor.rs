//! Coordinator for the map-reduce run
//!
//! Drives the chunk source, feeds a fixed pool of mapper workers, waits for
//! all of them at a join barrier and then reduces and ranks the results.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::AggregatorConfig;
use crate::counts::{GlobalAggregation, PartialAggregation};
use crate::error::AggError;
use crate::mapper::{GroupCountMapper, Mapper};
use crate::ranking::{select_top, RankedEntry};
use crate::reduce::reduce;
use crate::source::{Chunk, ChunkSource};
use crate::stats::ProcessingStats;

use super::sink::ResultSink;
use super::types::{ParallelConfig, ReaderReport, RunControl, WorkerReport};
use super::worker::worker_thread;

/// Lifecycle of one coordinator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Dispatching,
    Reducing,
    Ranking,
    Done,
    Errored,
}

impl CoordinatorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CoordinatorState::Done | CoordinatorState::Errored)
    }
}

/// Successful outcome of a run
#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub ranked: Vec<RankedEntry>,
    pub totals: GlobalAggregation,
    /// Wall-clock time from start to ranked result
    pub elapsed: Duration,
    pub stats: ProcessingStats,
}

/// Absolute and relative form of the dispatch deadline
#[derive(Debug, Clone, Copy)]
struct Deadline {
    limit: Duration,
    at: Instant,
    started: Instant,
}

impl Deadline {
    fn start(limit: Duration) -> Self {
        let started = Instant::now();
        Self {
            limit,
            at: started + limit,
            started,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    fn error(&self) -> AggError {
        AggError::Timeout {
            deadline: self.limit,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Owns the worker pool and runs the pipeline
/// `source -> map (parallel) -> sink -> reduce -> top-N`.
pub struct Coordinator<M: Mapper + 'static = GroupCountMapper> {
    config: AggregatorConfig,
    mapper: Arc<M>,
    state: CoordinatorState,
}

impl Coordinator<GroupCountMapper> {
    /// Coordinator counting records per `config.ranking.group_by`
    pub fn new(config: AggregatorConfig) -> Self {
        let mapper = GroupCountMapper::new(config.ranking.group_by.clone());
        Self::with_mapper(config, mapper)
    }
}

impl<M: Mapper + 'static> Coordinator<M> {
    pub fn with_mapper(config: AggregatorConfig, mapper: M) -> Self {
        Self {
            config,
            mapper: Arc::new(mapper),
            state: CoordinatorState::Idle,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Validate the configuration, open the configured input and run to completion.
    ///
    /// Configuration errors are reported before the input is touched.
    pub fn run(&mut self) -> Result<AggregationReport, AggError> {
        let started = Instant::now();
        self.state = CoordinatorState::Idle;
        let outcome = self
            .config
            .validate()
            .and_then(|()| ChunkSource::open(&self.config))
            .and_then(|source| self.execute(source, started));
        self.finish(outcome)
    }

    /// Run over an already opened source
    pub fn run_with_source(&mut self, source: ChunkSource) -> Result<AggregationReport, AggError> {
        let started = Instant::now();
        self.state = CoordinatorState::Idle;
        let outcome = self
            .config
            .validate()
            .and_then(|()| self.execute(source, started));
        self.finish(outcome)
    }

    fn finish(
        &mut self,
        outcome: Result<AggregationReport, AggError>,
    ) -> Result<AggregationReport, AggError> {
        match &outcome {
            Ok(report) => {
                self.transition(CoordinatorState::Done);
                info!(
                    entries = report.ranked.len(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "aggregation finished"
                );
            }
            Err(e) => {
                self.transition(CoordinatorState::Errored);
                warn!(error = %e, kind = ?e.kind(), "aggregation aborted");
            }
        }
        outcome
    }

    fn transition(&mut self, next: CoordinatorState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "coordinator state change");
            self.state = next;
        }
    }

    fn execute(
        &mut self,
        source: ChunkSource,
        started: Instant,
    ) -> Result<AggregationReport, AggError> {
        self.mapper.prepare(source.schema())?;

        let parallel = ParallelConfig::from(&self.config);
        let mut stats = ProcessingStats::new();
        stats.start_time = Some(started);
        stats.workers = parallel.num_workers;

        self.transition(CoordinatorState::Dispatching);
        let dispatch_started = Instant::now();
        let partials = self.map_phase(source, &parallel, &mut stats)?;
        stats.dispatch_time = dispatch_started.elapsed();

        self.transition(CoordinatorState::Reducing);
        let reduce_started = Instant::now();
        stats.partials_reduced = partials.len();
        let totals = reduce(partials);
        stats.distinct_keys = totals.len();
        stats.reduce_time = reduce_started.elapsed();

        self.transition(CoordinatorState::Ranking);
        let rank_started = Instant::now();
        let ranked = select_top(&totals, self.config.ranking.top_n);
        stats.rank_time = rank_started.elapsed();

        stats.finish_processing();
        Ok(AggregationReport {
            ranked,
            totals,
            elapsed: started.elapsed(),
            stats,
        })
    }

    /// Dispatch every chunk, wait for every worker, and hand back the partials.
    ///
    /// Returns only after the join barrier; on failure nothing collected so
    /// far escapes.
    fn map_phase(
        &self,
        source: ChunkSource,
        parallel: &ParallelConfig,
        stats: &mut ProcessingStats,
    ) -> Result<Vec<PartialAggregation>, AggError> {
        let deadline = parallel.deadline.map(Deadline::start);
        let sink = ResultSink::new();
        let control = RunControl::new();

        // Zero capacity is a direct handoff from the reader to an idle worker
        let (work_sender, work_receiver) = bounded::<Chunk>(parallel.queue_capacity);
        let (done_sender, done_receiver) = unbounded::<WorkerReport>();
        let (reader_sender, reader_receiver) = bounded::<Result<ReaderReport, AggError>>(1);

        let mut worker_handles: Vec<JoinHandle<()>> = Vec::with_capacity(parallel.num_workers);
        for worker_id in 0..parallel.num_workers {
            let work_receiver = work_receiver.clone();
            let mapper = Arc::clone(&self.mapper);
            let sink = sink.clone();
            let control = control.clone();
            let done_sender = done_sender.clone();

            let handle = thread::Builder::new()
                .name(format!("chunkagg-worker-{}", worker_id))
                .spawn(move || {
                    worker_thread(worker_id, work_receiver, mapper, sink, control, done_sender)
                })
                .map_err(|e| AggError::io("worker pool", e))?;
            worker_handles.push(handle);
        }

        // Workers hold the only remaining clones
        drop(work_receiver);
        drop(done_sender);

        let reader_control = control.clone();
        let reader_handle = thread::Builder::new()
            .name("chunkagg-reader".to_string())
            .spawn(move || {
                let mut source = source;
                let outcome = dispatch_chunks(&mut source, &work_sender, &reader_control, deadline);
                // Closing the queue lets idle workers exit once it is drained
                drop(work_sender);
                let _ = reader_sender.send(outcome);
            })
            .map_err(|e| AggError::io("chunk reader", e))?;

        if !wait_for_reader(&reader_receiver, &control, deadline, stats) {
            debug!("abandoning chunk reader and workers still in flight");
            return Err(take_failure(&control));
        }
        if reader_handle.join().is_err() {
            control.abort(AggError::MapFailure {
                chunk: None,
                record: None,
                reason: "chunk reader panicked".to_string(),
            });
        }

        let all_reported = wait_for_workers(&done_receiver, parallel.num_workers, &control, deadline, stats);

        if all_reported {
            for (worker_id, handle) in worker_handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    control.abort(AggError::MapFailure {
                        chunk: None,
                        record: None,
                        reason: format!("worker {} panicked", worker_id),
                    });
                }
            }
        } else {
            debug!("abandoning workers still in flight");
        }

        if let Some(failure) = control.take_failure() {
            return Err(failure);
        }

        if stats.chunks_mapped != stats.chunks_dispatched {
            return Err(AggError::MapFailure {
                chunk: None,
                record: None,
                reason: format!(
                    "{} chunks dispatched but {} mapped",
                    stats.chunks_dispatched, stats.chunks_mapped
                ),
            });
        }

        Ok(sink.drain())
    }
}

/// Reader thread body: read the source in order and queue each chunk for the pool.
///
/// Blocks while the queue is full. Stops early once the run is aborted.
fn dispatch_chunks(
    source: &mut ChunkSource,
    work_sender: &Sender<Chunk>,
    control: &RunControl,
    deadline: Option<Deadline>,
) -> Result<ReaderReport, AggError> {
    let mut report = ReaderReport::default();
    loop {
        if control.is_aborted() {
            debug!("dispatch stopped after abort");
            return Ok(report);
        }
        if let Some(deadline) = deadline.filter(Deadline::expired) {
            return Err(deadline.error());
        }

        let chunk = match source.next_chunk()? {
            Some(chunk) => chunk,
            None => break,
        };
        let index = chunk.index();
        let records = chunk.len();
        report.records_read += records as u64;

        let sent = match deadline {
            Some(deadline) => work_sender.send_deadline(chunk, deadline.at).map_err(|e| match e {
                SendTimeoutError::Timeout(_) => deadline.error(),
                SendTimeoutError::Disconnected(_) => pool_gone(),
            }),
            None => work_sender.send(chunk).map_err(|_| pool_gone()),
        };
        sent?;

        report.chunks_dispatched += 1;
        debug!(chunk = index, records, "dispatched chunk");
    }

    debug!(
        chunks = report.chunks_dispatched,
        records = report.records_read,
        "end of input"
    );
    Ok(report)
}

fn pool_gone() -> AggError {
    AggError::MapFailure {
        chunk: None,
        record: None,
        reason: "worker pool exited before input was exhausted".to_string(),
    }
}

/// The recorded failure, or a generic one if the slot was already emptied
fn take_failure(control: &RunControl) -> AggError {
    control.take_failure().unwrap_or_else(|| AggError::MapFailure {
        chunk: None,
        record: None,
        reason: "run aborted".to_string(),
    })
}

/// Wait for the reader to reach end of input or fail.
///
/// Returns `false` when the deadline passed first; the reader may still be
/// blocked in a read and is left behind.
fn wait_for_reader(
    reader_receiver: &Receiver<Result<ReaderReport, AggError>>,
    control: &RunControl,
    deadline: Option<Deadline>,
    stats: &mut ProcessingStats,
) -> bool {
    let outcome = match deadline {
        Some(deadline) => match reader_receiver.recv_deadline(deadline.at) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                control.abort(deadline.error());
                return false;
            }
            Err(RecvTimeoutError::Disconnected) => return true,
        },
        // Disconnected means the reader panicked; the join reports it
        None => match reader_receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => return true,
        },
    };

    match outcome {
        Ok(report) => {
            stats.records_read = report.records_read;
            stats.chunks_dispatched = report.chunks_dispatched;
        }
        Err(e) => {
            warn!(error = %e, "chunk reader failed");
            control.abort(e);
        }
    }
    true
}

/// Join barrier: collect one report per worker.
///
/// Returns `false` when the deadline passed first; the stragglers are left to
/// finish on their own and the run is aborted with a timeout.
fn wait_for_workers(
    done_receiver: &Receiver<WorkerReport>,
    num_workers: usize,
    control: &RunControl,
    deadline: Option<Deadline>,
    stats: &mut ProcessingStats,
) -> bool {
    let mut reported = 0;
    while reported < num_workers {
        let report = match deadline {
            Some(deadline) => match done_receiver.recv_deadline(deadline.at) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => {
                    control.abort(deadline.error());
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match done_receiver.recv() {
                Ok(report) => report,
                Err(_) => break,
            },
        };
        debug!(
            worker = report.worker_id,
            chunks = report.stats.chunks_mapped,
            "worker finished"
        );
        stats.merge_worker_stats(&report.stats);
        reported += 1;
    }
    true
}
