// Elven Canopy Corpus Training
//
// Offline training stage for the Palestrina-style music generator. Takes
// interval sequences extracted from a corpus of polyphonic pieces and builds
// the statistical guidance the generator loads at startup: interval Markov
// models and a library of recurring motifs. Notation parsing happens
// upstream; this crate only sees plain integer sequences.
//
// Architecture:
// - interval.rs: Interval type, melodic/harmonic clamp ranges, IntervalKey
//   composite key for contexts and n-grams
// - counts.rs: Count tables and the mergeable per-worker accumulator
// - markov.rs: Melodic (orders 0-3) and harmonic (order 0-1) model builders
// - motif.rs: Cross-piece motif mining, ranking, and the motif library
// - corpus.rs: Interval corpus types and the skip-and-continue reader
// - config.rs: Training configuration (JSON, all fields defaulted)
// - artifact.rs: Artifact file names and JSON read/write
// - train.rs: Full training run with precondition checks and summaries
// - error.rs: CorpusError
//
// Every builder is a deterministic batch function: one counting pass split
// across rayon workers, a merge, then pruning or ranking. Results do not
// depend on the number of workers. There is no incremental update; retrain
// from scratch when the corpus changes.

pub mod artifact;
pub mod config;
pub mod corpus;
pub mod counts;
pub mod error;
pub mod interval;
pub mod markov;
pub mod motif;
pub mod train;

pub use config::{MotifConfig, PieceGrouping, TrainingConfig};
pub use corpus::{Corpus, CorpusReader, Piece, PieceId, VoiceLine};
pub use error::{CorpusError, Result};
pub use markov::{HarmonicModel, MarkovModels, MelodicModel};
pub use motif::{Motif, MotifLibrary};
pub use train::{TrainedArtifacts, run, train};
