//! Result sink for parallel processing
//!
//! Collects partial aggregations from concurrently running workers.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::counts::PartialAggregation;

/// Thread-safe, append-only collection of partial aggregations.
///
/// Clones share the same underlying collection. Every `submit` is applied
/// under the lock, so no partial is lost or duplicated regardless of how
/// many workers submit at once. Submission order is not preserved.
#[derive(Debug, Default, Clone)]
pub struct ResultSink {
    partials: Arc<Mutex<Vec<PartialAggregation>>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the partials with poison recovery
    fn lock_partials(&self) -> MutexGuard<'_, Vec<PartialAggregation>> {
        match self.partials.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering result sink");
                poisoned.into_inner()
            }
        }
    }

    /// Hand a finished partial aggregation over to the sink
    pub fn submit(&self, partial: PartialAggregation) {
        self.lock_partials().push(partial);
    }

    /// Take everything submitted so far.
    ///
    /// Only complete once every map task has finished; an earlier call sees a
    /// subset of the partials, never a torn one.
    pub fn drain(&self) -> Vec<PartialAggregation> {
        std::mem::take(&mut *self.lock_partials())
    }

    pub fn len(&self) -> usize {
        self.lock_partials().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_partials().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::KeyCounts;
    use std::thread;

    #[test]
    fn test_submit_then_drain() {
        let sink = ResultSink::new();
        sink.submit([("A", 1)].into_iter().collect());
        sink.submit([("B", 2)].into_iter().collect());
        assert_eq!(sink.len(), 2);

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_concurrent_submits_are_all_kept() {
        let sink = ResultSink::new();
        let threads = 8;
        let per_thread = 250;

        thread::scope(|scope| {
            for t in 0..threads {
                let sink = sink.clone();
                scope.spawn(move || {
                    for i in 0..per_thread {
                        let key = format!("t{}-{}", t, i);
                        sink.submit([(key, 1u64)].into_iter().collect());
                    }
                });
            }
        });

        let drained = sink.drain();
        assert_eq!(drained.len(), threads * per_thread);
        let total: u64 = drained.iter().map(KeyCounts::total).sum();
        assert_eq!(total, (threads * per_thread) as u64);
    }

    #[test]
    fn test_clones_share_storage() {
        let sink = ResultSink::new();
        let other = sink.clone();
        other.submit(KeyCounts::new());
        assert_eq!(sink.len(), 1);
    }
}
