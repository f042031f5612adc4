// Interval corpus: the data handed over by the notation reader.
//
// The notation reader (out of this crate) parses each piece of the corpus
// and writes plain interval sequences: one per voice part (signed semitone
// steps between consecutive notes) and one per voice pair (signed semitone
// distance between the two voices at each shared onset). Beat-strength tags
// may ride along with the melodic sequences; nothing here consumes them.
//
// `CorpusReader` accepts two layouts:
// - a single JSON file holding `{ "pieces": [...] }`, or
// - a directory of per-piece `*.json` files, read in file-name order.
//
// In directory mode a piece that fails to read or parse is logged and
// skipped, and the pass carries on. A single-file corpus that fails to parse
// is fatal, since there is nothing left to train on.
//
// Pieces are identified by their position in the loaded corpus (`PieceId`).
// That index is the piece group the motif miner uses for its cross-piece
// coverage filter.

use crate::error::{CorpusError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Position of a piece in the loaded corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub usize);

/// One voice part of a piece.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLine {
    /// Semitone steps between consecutive notes, unclamped.
    pub intervals: Vec<i32>,
    /// Beat-strength class per interval (0 = strongest .. 3 = weakest).
    #[serde(default)]
    pub metric_positions: Vec<u8>,
}

impl VoiceLine {
    pub fn new(intervals: Vec<i32>) -> Self {
        VoiceLine {
            intervals,
            metric_positions: Vec::new(),
        }
    }
}

/// A single piece: its voice parts and its voice-pair sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub voices: Vec<VoiceLine>,
    /// Harmonic intervals per voice pair, unclamped.
    #[serde(default)]
    pub voice_pairs: Vec<Vec<i32>>,
}

/// A melodic sequence tagged with the piece it came from.
#[derive(Clone, Copy, Debug)]
pub struct VoiceSequence<'a> {
    pub piece: PieceId,
    pub intervals: &'a [i32],
}

/// The full training corpus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub pieces: Vec<Piece>,
}

impl Corpus {
    pub fn new(pieces: Vec<Piece>) -> Self {
        Corpus { pieces }
    }

    /// Every voice's melodic intervals, in corpus order.
    pub fn melodic_sequences(&self) -> Vec<&[i32]> {
        self.pieces
            .iter()
            .flat_map(|p| p.voices.iter().map(|v| v.intervals.as_slice()))
            .collect()
    }

    /// Every voice pair's harmonic intervals, in corpus order.
    pub fn harmonic_sequences(&self) -> Vec<&[i32]> {
        self.pieces
            .iter()
            .flat_map(|p| p.voice_pairs.iter().map(Vec::as_slice))
            .collect()
    }

    /// Melodic sequences with their piece ids, in the same order as
    /// `melodic_sequences`.
    pub fn voice_sequences(&self) -> Vec<VoiceSequence<'_>> {
        self.pieces
            .iter()
            .enumerate()
            .flat_map(|(i, p)| {
                let piece = PieceId(i);
                p.voices.iter().map(move |v| VoiceSequence {
                    piece,
                    intervals: &v.intervals,
                })
            })
            .collect()
    }

    pub fn num_voices(&self) -> usize {
        self.pieces.iter().map(|p| p.voices.len()).sum()
    }

    pub fn num_voice_pairs(&self) -> usize {
        self.pieces.iter().map(|p| p.voice_pairs.len()).sum()
    }

    /// Total melodic intervals across all voices.
    pub fn melodic_observations(&self) -> usize {
        self.pieces
            .iter()
            .flat_map(|p| &p.voices)
            .map(|v| v.intervals.len())
            .sum()
    }

    /// Total harmonic intervals across all voice pairs.
    pub fn harmonic_observations(&self) -> usize {
        self.pieces
            .iter()
            .flat_map(|p| &p.voice_pairs)
            .map(Vec::len)
            .sum()
    }
}

/// Outcome counts of a corpus read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Loads a `Corpus` from disk.
#[derive(Clone, Debug, Default)]
pub struct CorpusReader {
    max_pieces: Option<usize>,
}

impl CorpusReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read at most `max_pieces` pieces (`None` = all).
    pub fn with_max_pieces(mut self, max_pieces: Option<usize>) -> Self {
        self.max_pieces = max_pieces;
        self
    }

    /// Read a corpus file or a directory of piece files.
    pub fn read(&self, path: &Path) -> Result<(Corpus, ReadSummary)> {
        if path.is_dir() {
            self.read_dir(path)
        } else {
            self.read_file(path)
        }
    }

    fn read_file(&self, path: &Path) -> Result<(Corpus, ReadSummary)> {
        let data = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
        let mut corpus: Corpus =
            serde_json::from_str(&data).map_err(|e| CorpusError::json(path, e))?;
        if let Some(max) = self.max_pieces {
            corpus.pieces.truncate(max);
        }
        info!(
            "Loaded {} pieces from {}",
            corpus.pieces.len(),
            path.display()
        );
        let summary = ReadSummary {
            loaded: corpus.pieces.len(),
            skipped: 0,
        };
        Ok((corpus, summary))
    }

    fn read_dir(&self, dir: &Path) -> Result<(Corpus, ReadSummary)> {
        let mut paths = piece_files(dir)?;
        if let Some(max) = self.max_pieces {
            paths.truncate(max);
        }
        info!("Found {} pieces to analyze in {}", paths.len(), dir.display());

        let mut corpus = Corpus::default();
        let mut summary = ReadSummary::default();
        let total = paths.len();

        for (i, path) in paths.iter().enumerate() {
            match read_piece(path) {
                Ok(piece) => {
                    debug!(
                        "Read {}: {} voices, {} pairs",
                        path.display(),
                        piece.voices.len(),
                        piece.voice_pairs.len()
                    );
                    corpus.pieces.push(piece);
                    summary.loaded += 1;
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", display_name(path));
                    summary.skipped += 1;
                }
            }

            if (i + 1) % 10 == 0 || i + 1 == total {
                info!(
                    "Processed {}/{} (voices: {}, pairs: {}, skipped: {})",
                    i + 1,
                    total,
                    corpus.num_voices(),
                    corpus.num_voice_pairs(),
                    summary.skipped
                );
            }
        }

        Ok((corpus, summary))
    }
}

/// Sorted list of `*.json` files directly inside `dir`.
fn piece_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CorpusError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CorpusError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_piece(path: &Path) -> Result<Piece> {
    let data = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let mut piece: Piece = serde_json::from_str(&data).map_err(|e| CorpusError::json(path, e))?;
    if piece.name.is_empty() {
        piece.name = display_name(path);
    }
    Ok(piece)
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
