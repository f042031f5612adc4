// Count tables and the mergeable accumulator behind every model builder.
//
// `TransitionCounts` maps a context key to the occurrence counts of the
// intervals that followed it. Builders fill one accumulator per rayon worker
// over a slice of the corpus, then combine them with `merge`. Merging is
// element-wise count addition, so it is commutative and associative and the
// merged totals do not depend on how the corpus was partitioned.
//
// Nothing outside a builder ever sees a `TransitionCounts`. `prune` consumes
// it and returns the sorted, immutable `ContextTable` that ends up in the
// model artifact.

use crate::interval::{Interval, IntervalKey};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Next-interval occurrence counts. Sorted so the JSON artifact is stable.
pub type CountTable = BTreeMap<Interval, u32>;

/// Context key -> continuation counts, as stored in a finished model.
pub type ContextTable = BTreeMap<IntervalKey, CountTable>;

/// A context with fewer distinct continuations than this carries no
/// branching information and is dropped from the model.
pub const MIN_DISTINCT_CONTINUATIONS: usize = 2;

/// Add one observation of `interval` to a count table. Counts saturate at
/// `u32::MAX` rather than wrapping.
pub fn record(table: &mut CountTable, interval: Interval) {
    let count = table.entry(interval).or_insert(0);
    *count = count.saturating_add(1);
}

/// Add every count in `other` into `into`.
pub fn merge_tables(into: &mut CountTable, other: CountTable) {
    for (interval, count) in other {
        let total = into.entry(interval).or_insert(0);
        *total = total.saturating_add(count);
    }
}

/// Sum of all counts in a table.
pub fn table_total(table: &CountTable) -> u64 {
    table.values().map(|&c| c as u64).sum()
}

/// Partial transition counts for one order, local to a single build.
#[derive(Clone, Debug, Default)]
pub struct TransitionCounts {
    contexts: FxHashMap<IntervalKey, CountTable>,
}

impl TransitionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `next` as a continuation of `context`.
    pub fn record(&mut self, context: &[Interval], next: Interval) {
        let table = self.contexts.entry(IntervalKey::new(context)).or_default();
        record(table, next);
    }

    /// Fold another partial accumulator into this one.
    pub fn merge(mut self, other: TransitionCounts) -> TransitionCounts {
        // Iterate over the smaller side.
        let (mut big, small) = if self.contexts.len() >= other.contexts.len() {
            (std::mem::take(&mut self.contexts), other.contexts)
        } else {
            (other.contexts, std::mem::take(&mut self.contexts))
        };
        for (key, table) in small {
            match big.get_mut(&key) {
                Some(existing) => merge_tables(existing, table),
                None => {
                    big.insert(key, table);
                }
            }
        }
        TransitionCounts { contexts: big }
    }

    /// Drop every context with fewer than `MIN_DISTINCT_CONTINUATIONS`
    /// distinct next intervals and return the rest as a sorted table.
    pub fn prune(self) -> ContextTable {
        self.contexts
            .into_iter()
            .filter(|(_, table)| table.len() >= MIN_DISTINCT_CONTINUATIONS)
            .collect()
    }
}
