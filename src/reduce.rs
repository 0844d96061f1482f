use crate::counts::{GlobalAggregation, PartialAggregation};

/// Merge partial aggregations into one global aggregation by summing counts
/// per key.
///
/// The result does not depend on the order in which partials arrive. Runs
/// on the calling thread once every map task has finished.
pub fn reduce<I>(partials: I) -> GlobalAggregation
where
    I: IntoIterator<Item = PartialAggregation>,
{
    let mut partials: Vec<PartialAggregation> = partials.into_iter().collect();

    // Start from the widest partial so its keys are moved rather than rehashed
    let widest = partials
        .iter()
        .enumerate()
        .max_by_key(|(_, partial)| partial.len())
        .map(|(index, _)| index);

    let mut global = match widest {
        Some(index) => partials.swap_remove(index),
        None => return GlobalAggregation::new(),
    };

    for partial in partials {
        global.merge(partial);
    }
    global
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::KeyCounts;
    use proptest::prelude::*;

    fn counts(pairs: &[(&str, u64)]) -> KeyCounts {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_reduce_sums_per_key() {
        let global = reduce(vec![counts(&[("A", 1), ("B", 1)]), counts(&[("A", 1)])]);
        assert_eq!(global, counts(&[("A", 2), ("B", 1)]));
    }

    #[test]
    fn test_reduce_of_nothing_is_empty() {
        assert!(reduce(Vec::new()).is_empty());
    }

    #[test]
    fn test_reduce_single_partial_is_identity() {
        let only = counts(&[("x", 9)]);
        assert_eq!(reduce(vec![only.clone()]), only);
    }

    fn partials_strategy() -> impl Strategy<Value = Vec<Vec<(String, u64)>>> {
        prop::collection::vec(
            prop::collection::vec(("[a-e]{1,2}", 1u64..50), 0..8),
            0..10,
        )
    }

    proptest! {
        #[test]
        fn prop_reduce_is_order_independent(raw in partials_strategy(), seed in any::<u64>()) {
            let partials: Vec<KeyCounts> = raw
                .iter()
                .map(|pairs| pairs.iter().map(|(k, v)| (k.clone(), *v)).collect())
                .collect();

            let mut shuffled = partials.clone();
            // Deterministic permutation driven by the generated seed
            let len = shuffled.len();
            if len > 1 {
                let mut state = seed;
                for i in (1..len).rev() {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let j = (state >> 33) as usize % (i + 1);
                    shuffled.swap(i, j);
                }
            }

            prop_assert_eq!(reduce(partials), reduce(shuffled));
        }

        #[test]
        fn prop_reduce_preserves_total(raw in partials_strategy()) {
            let partials: Vec<KeyCounts> = raw
                .iter()
                .map(|pairs| pairs.iter().map(|(k, v)| (k.clone(), *v)).collect())
                .collect();
            let expected: u64 = partials.iter().map(KeyCounts::total).sum();
            prop_assert_eq!(reduce(partials).total(), expected);
        }
    }
}
