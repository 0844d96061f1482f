use serde::Serialize;
use std::collections::hash_map::{self, HashMap};

/// Mapping from key to a non-negative count.
///
/// Lookups of absent keys read as zero; the mapping never stores zeros
/// produced by [`KeyCounts::increment`] or [`KeyCounts::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyCounts {
    counts: HashMap<String, u64>,
}

/// Counts produced by one mapper invocation from one chunk
pub type PartialAggregation = KeyCounts;

/// Pointwise sum of every partial aggregation of a run
pub type GlobalAggregation = KeyCounts;

impl KeyCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: HashMap::with_capacity(capacity),
        }
    }

    /// Count of `key`, or zero when it was never seen
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, key: &str) {
        self.add_ref(key, 1);
    }

    /// Add `count` to `key`, taking ownership of the key only when it is new
    pub fn add(&mut self, key: String, count: u64) {
        if count == 0 {
            return;
        }
        *self.counts.entry(key).or_insert(0) += count;
    }

    fn add_ref(&mut self, key: &str, count: u64) {
        match self.counts.get_mut(key) {
            Some(existing) => *existing += count,
            None => {
                self.counts.insert(key.to_owned(), count);
            }
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Fold another mapping into this one
    pub fn merge(&mut self, other: KeyCounts) {
        if self.counts.is_empty() {
            self.counts = other.counts;
            return;
        }
        for (key, count) in other.counts {
            self.add(key, count);
        }
    }
}

impl IntoIterator for KeyCounts {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for KeyCounts {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut counts = KeyCounts::new();
        for (key, count) in iter {
            counts.add(key.into(), count);
        }
        counts
    }
}
