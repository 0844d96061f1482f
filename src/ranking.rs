use serde::Serialize;
use std::cmp::Ordering;

use crate::counts::GlobalAggregation;

/// One line of the ranked result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Count descending, then key ascending so ties come out the same on every run
fn rank_order(a: &(&str, u64), b: &(&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// The `n` highest-counted keys, `min(n, distinct keys)` long.
pub fn select_top(global: &GlobalAggregation, n: usize) -> Vec<RankedEntry> {
    if n == 0 || global.is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<(&str, u64)> = global.iter().collect();
    if n < entries.len() {
        entries.select_nth_unstable_by(n - 1, rank_order);
        entries.truncate(n);
    }
    entries.sort_unstable_by(rank_order);

    entries
        .into_iter()
        .map(|(key, count)| RankedEntry::new(key, count))
        .collect()
}
