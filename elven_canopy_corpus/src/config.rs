// Training configuration.
//
// `TrainingConfig` holds the tunable parts of a training run, loaded from
// JSON. Every field has a default (`#[serde(default)]`), so a config file
// only needs the fields it changes. With no file at all, motifs are 4-10
// intervals long, need 3 occurrences across at least 2 pieces, and the
// library keeps the top 50. The `train` binary applies its command-line
// flags on top of whatever was loaded.
//
// The clamp ranges, Markov orders, and the two-continuation pruning rule are
// fixed properties of the artifact format and are not configurable; see
// `interval.rs` and `counts.rs`.

use crate::error::{CorpusError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How motif occurrences are attributed to pieces for the cross-piece
/// coverage filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceGrouping {
    /// Use the piece boundaries supplied by the corpus reader.
    Explicit,
    /// Legacy approximation for flat voice dumps: group = sequential voice
    /// index / n. Wrong for any piece that does not have exactly n voices.
    FixedVoiceCount(usize),
}

/// Motif mining parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotifConfig {
    /// Shortest n-gram considered (intervals, not notes).
    pub min_length: usize,
    /// Longest n-gram considered.
    pub max_length: usize,
    /// Minimum total occurrences across the corpus.
    pub min_frequency: u32,
    /// Minimum number of distinct piece groups the n-gram appears in.
    pub min_pieces: usize,
    /// Size bound of the ranked library.
    pub library_size: usize,
    pub grouping: PieceGrouping,
}

impl Default for MotifConfig {
    fn default() -> Self {
        MotifConfig {
            min_length: 4,
            max_length: 10,
            min_frequency: 3,
            min_pieces: 2,
            library_size: 50,
            grouping: PieceGrouping::Explicit,
        }
    }
}

impl MotifConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 {
            return Err(CorpusError::InvalidConfig(
                "motif.min_length must be at least 1".into(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(CorpusError::InvalidConfig(format!(
                "motif.min_length ({}) exceeds motif.max_length ({})",
                self.min_length, self.max_length
            )));
        }
        if self.library_size == 0 {
            return Err(CorpusError::InvalidConfig(
                "motif.library_size must be at least 1".into(),
            ));
        }
        if self.grouping == PieceGrouping::FixedVoiceCount(0) {
            return Err(CorpusError::InvalidConfig(
                "motif.grouping voice count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level training configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub motif: MotifConfig,
    /// Treat a corpus with no harmonic intervals as fatal. Off by default: a
    /// corpus of single-voice pieces has no voice pairs at all.
    pub require_harmonic: bool,
    /// Worker threads for the counting passes. `None` uses rayon's default.
    pub worker_threads: Option<usize>,
    /// Read at most this many pieces from a corpus directory.
    pub max_pieces: Option<usize>,
}

impl TrainingConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
        let config: TrainingConfig =
            serde_json::from_str(&data).map_err(|e| CorpusError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.motif.validate()?;
        if self.worker_threads == Some(0) {
            return Err(CorpusError::InvalidConfig(
                "worker_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
