// Markov model construction for melodic and harmonic guidance.
//
// Builds the two count models that `elven_canopy_music::markov` loads from
// `markov_models.json`:
// - MelodicModel: interval-based, orders 0-3. Order 0 is the global interval
//   distribution; order k maps the k preceding intervals to the counts of
//   the interval that followed them.
// - HarmonicModel: per-voice-pair interval distribution (unigram) plus a
//   first-order table keyed by the interval between the two voices at the
//   previous shared onset. Higher orders are not modeled.
//
// Both builders clamp first (see `interval.rs`), then make one counting pass
// over the corpus, partitioned across rayon workers with per-worker
// accumulators merged by count addition (`counts.rs`). After the merge,
// contexts with a single observed continuation are pruned.
//
// The models hold raw counts only. Sampling and Katz backoff (3rd -> 2nd ->
// 1st -> unigram when a context is missing) belong to the generator; the
// pruning here is what makes that backoff kick in for contexts that never
// branched in the corpus.

use crate::artifact;
use crate::counts::{self, ContextTable, CountTable, TransitionCounts};
use crate::error::{CorpusError, Result};
use crate::interval::{HARMONIC_RANGE, Interval, IntervalKey, IntervalRange, MELODIC_RANGE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest melodic context length.
pub const MAX_MELODIC_ORDER: usize = 3;

/// Melodic interval model, orders 0-3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodicModel {
    /// Order-3 transitions: (context of 3 intervals) -> next interval counts
    pub order3: ContextTable,
    /// Order-2 transitions
    pub order2: ContextTable,
    /// Order-1 transitions
    pub order1: ContextTable,
    /// Order-0 (unigram): overall interval distribution
    pub order0: CountTable,
}

impl MelodicModel {
    /// Transition table for `order` in 1..=3.
    pub fn order(&self, order: usize) -> Option<&ContextTable> {
        match order {
            1 => Some(&self.order1),
            2 => Some(&self.order2),
            3 => Some(&self.order3),
            _ => None,
        }
    }

    /// Counts for the exact context given; the context length selects the
    /// order. An empty context returns the unigram table. No backoff.
    pub fn continuations(&self, context: &[Interval]) -> Option<&CountTable> {
        if context.is_empty() {
            return Some(&self.order0);
        }
        self.order(context.len())?.get(&IntervalKey::new(context))
    }

    /// Number of melodic intervals the model was built from.
    pub fn total_observations(&self) -> u64 {
        counts::table_total(&self.order0)
    }

    pub fn is_empty(&self) -> bool {
        self.order0.is_empty()
    }
}

/// Per-voice-pair harmonic model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonicModel {
    /// Transition: previous interval between voices -> next interval counts
    pub transitions: ContextTable,
    /// Unigram: overall interval distribution between voice pairs
    pub unigram: CountTable,
}

impl HarmonicModel {
    /// Counts for what followed `previous`, if that context was retained.
    pub fn continuations(&self, previous: Interval) -> Option<&CountTable> {
        self.transitions.get(&IntervalKey::new(&[previous]))
    }

    pub fn total_observations(&self) -> u64 {
        counts::table_total(&self.unigram)
    }

    pub fn is_empty(&self) -> bool {
        self.unigram.is_empty()
    }
}

/// The complete set of Markov models written after corpus analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovModels {
    pub melodic: MelodicModel,
    pub harmonic: HarmonicModel,
}

impl MarkovModels {
    /// Load from a JSON file, rejecting models this crate could not have
    /// written.
    pub fn load(path: &Path) -> Result<Self> {
        let models: MarkovModels = artifact::read_json(path)?;
        models
            .validate()
            .map_err(|reason| CorpusError::InvalidArtifact {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(models)
    }

    /// Check every interval is inside its clamp range, every context has the
    /// length of its order, and pruning held.
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_table("melodic order0", &self.melodic.order0, MELODIC_RANGE)?;
        for order in 1..=MAX_MELODIC_ORDER {
            if let Some(contexts) = self.melodic.order(order) {
                let name = format!("melodic order{order}");
                check_contexts(&name, contexts, order, MELODIC_RANGE)?;
            }
        }
        check_table("harmonic unigram", &self.harmonic.unigram, HARMONIC_RANGE)?;
        check_contexts(
            "harmonic transitions",
            &self.harmonic.transitions,
            1,
            HARMONIC_RANGE,
        )
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::write_json(path, self)
    }
}

fn check_table(name: &str, table: &CountTable, range: IntervalRange) -> std::result::Result<(), String> {
    match table.keys().find(|&&iv| !range.contains(iv)) {
        Some(iv) => Err(format!("{name}: interval {iv} outside clamp range")),
        None => Ok(()),
    }
}

fn check_contexts(
    name: &str,
    contexts: &ContextTable,
    order: usize,
    range: IntervalRange,
) -> std::result::Result<(), String> {
    for (context, table) in contexts {
        if context.len() != order {
            return Err(format!("{name}: context \"{context}\" is not of length {order}"));
        }
        if let Some(iv) = context.as_slice().iter().find(|&&iv| !range.contains(iv)) {
            return Err(format!("{name}: context \"{context}\" has interval {iv} outside clamp range"));
        }
        if table.len() < counts::MIN_DISTINCT_CONTINUATIONS {
            return Err(format!("{name}: context \"{context}\" has a single continuation"));
        }
        check_table(name, table, range)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Partial melodic counts for one slice of the corpus.
#[derive(Clone, Debug, Default)]
struct MelodicCounts {
    order0: CountTable,
    /// Index k-1 holds the order-k contexts.
    orders: [TransitionCounts; MAX_MELODIC_ORDER],
}

impl MelodicCounts {
    fn observe(&mut self, raw: &[i32]) {
        let intervals = MELODIC_RANGE.clamp_all(raw);
        for (i, &next) in intervals.iter().enumerate() {
            counts::record(&mut self.order0, next);
            for order in 1..=MAX_MELODIC_ORDER.min(i) {
                self.orders[order - 1].record(&intervals[i - order..i], next);
            }
        }
    }

    fn merge(mut self, other: MelodicCounts) -> MelodicCounts {
        counts::merge_tables(&mut self.order0, other.order0);
        let [a1, a2, a3] = self.orders;
        let [b1, b2, b3] = other.orders;
        self.orders = [a1.merge(b1), a2.merge(b2), a3.merge(b3)];
        self
    }

    fn finish(self) -> MelodicModel {
        let [order1, order2, order3] = self.orders.map(TransitionCounts::prune);
        MelodicModel {
            order3,
            order2,
            order1,
            order0: self.order0,
        }
    }
}

/// Partial harmonic counts for one slice of the corpus.
#[derive(Clone, Debug, Default)]
struct HarmonicCounts {
    unigram: CountTable,
    transitions: TransitionCounts,
}

impl HarmonicCounts {
    fn observe(&mut self, raw: &[i32]) {
        let intervals = HARMONIC_RANGE.clamp_all(raw);
        for &iv in &intervals {
            counts::record(&mut self.unigram, iv);
        }
        for pair in intervals.windows(2) {
            self.transitions.record(&pair[..1], pair[1]);
        }
    }

    fn merge(mut self, other: HarmonicCounts) -> HarmonicCounts {
        counts::merge_tables(&mut self.unigram, other.unigram);
        self.transitions = self.transitions.merge(other.transitions);
        self
    }

    fn finish(self) -> HarmonicModel {
        HarmonicModel {
            transitions: self.transitions.prune(),
            unigram: self.unigram,
        }
    }
}

/// Build the melodic model from every voice's interval sequence.
///
/// Runs on the current rayon pool. An empty input gives an empty model; the
/// caller decides whether that is fatal.
pub fn build_melodic_model<S>(sequences: &[S]) -> MelodicModel
where
    S: AsRef<[i32]> + Sync,
{
    sequences
        .par_iter()
        .fold(MelodicCounts::default, |mut acc, seq| {
            acc.observe(seq.as_ref());
            acc
        })
        .reduce(MelodicCounts::default, MelodicCounts::merge)
        .finish()
}

/// Build the harmonic model from every voice pair's interval sequence.
pub fn build_harmonic_model<S>(sequences: &[S]) -> HarmonicModel
where
    S: AsRef<[i32]> + Sync,
{
    sequences
        .par_iter()
        .fold(HarmonicCounts::default, |mut acc, seq| {
            acc.observe(seq.as_ref());
            acc
        })
        .reduce(HarmonicCounts::default, HarmonicCounts::merge)
        .finish()
}
