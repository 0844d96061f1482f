use std::time::{Duration, Instant};

/// Per-worker accounting, merged into [`ProcessingStats`] at the join barrier
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    pub chunks_mapped: usize,
    pub records_mapped: u64,
    pub busy_time: Duration,
}

/// Statistics collected during an aggregation run
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub records_read: u64,
    pub records_mapped: u64,
    pub chunks_dispatched: usize,
    pub chunks_mapped: usize,
    pub partials_reduced: usize,
    pub distinct_keys: usize,
    pub workers: usize,
    pub worker_busy_time: Duration,
    pub dispatch_time: Duration,
    pub reduce_time: Duration,
    pub rank_time: Duration,
    pub processing_time: Duration,
    pub start_time: Option<Instant>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn merge_worker_stats(&mut self, worker: &WorkerStats) {
        self.chunks_mapped += worker.chunks_mapped;
        self.records_mapped += worker.records_mapped;
        self.worker_busy_time += worker.busy_time;
    }

    pub fn finish_processing(&mut self) {
        if let Some(start) = self.start_time {
            self.processing_time = start.elapsed();
        }
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Records processed: {} total in {} chunks, {} distinct keys",
            self.records_read, self.chunks_mapped, self.distinct_keys
        );

        if self.workers > 0 {
            output.push_str(&format!(", {} workers", self.workers));
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.records_read > 0 {
            let records_per_sec = (self.records_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} records/s)", records_per_sec));
        }

        output.push_str(&format!(
            "\nPhases: dispatch {}ms, reduce {}ms, rank {}ms",
            self.dispatch_time.as_millis(),
            self.reduce_time.as_millis(),
            self.rank_time.as_millis()
        ));

        if self.workers > 0 && !self.dispatch_time.is_zero() {
            let capacity = self.dispatch_time.as_secs_f64() * self.workers as f64;
            let utilisation = self.worker_busy_time.as_secs_f64() / capacity * 100.0;
            output.push_str(&format!(", worker utilisation {:.0}%", utilisation.min(100.0)));
        }

        output
    }
}
