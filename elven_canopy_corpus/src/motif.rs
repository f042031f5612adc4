// Motif mining: interval n-grams that recur across several pieces.
//
// Every contiguous window of `min_length..=max_length` clamped melodic
// intervals is an n-gram. For each n-gram we keep its total occurrence count
// and the set of piece groups it occurred in. An n-gram becomes a motif only
// if it is both frequent (`min_frequency`) and shared by several pieces
// (`min_pieces`): raw frequency alone favours material one piece repeats
// over and over, which is that piece's theme rather than the style's
// vocabulary.
//
// Surviving motifs are ranked by descending frequency (ties by interval
// tuple, ascending) and cut to `library_size`. The result is written as
// `motif_library.json` and loaded by `elven_canopy_music` for structure
// planning.
//
// Piece groups normally come straight from the corpus (one group per
// piece). `PieceGrouping::FixedVoiceCount` reproduces the older
// voice-index / voices-per-piece approximation for corpora that were
// exported as a flat list of voices.
//
// `typical_entry_offset` and `typical_transposition` are not measured. They
// are fixed defaults wrapped in `Unmodeled` until something computes real
// placement statistics.

use crate::artifact;
use crate::config::{MotifConfig, PieceGrouping};
use crate::corpus::VoiceSequence;
use crate::error::{CorpusError, Result};
use crate::interval::{Interval, IntervalKey, MELODIC_RANGE};
use log::debug;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default voice entry offset (eighth-note beats, one 4/4 bar).
pub const DEFAULT_ENTRY_OFFSET: u8 = 8;

/// Default imitation transposition (semitones, a perfect 5th).
pub const DEFAULT_TRANSPOSITION: i8 = 7;

/// A value that was not learned from the corpus. Serializes as the bare
/// inner value, so the artifact format is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unmodeled<T>(pub T);

impl<T> Unmodeled<T> {
    pub fn value(&self) -> &T {
        &self.0
    }
}

/// Motif: a short melodic pattern extracted from the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motif {
    /// Interval sequence (semitones between consecutive notes).
    pub intervals: Vec<Interval>,
    /// How often this pattern appeared in the corpus.
    pub frequency: u32,
    /// Entry offset between voices (eighth-note beats). Fixed default.
    pub typical_entry_offset: Unmodeled<u8>,
    /// Transposition for imitation (semitones). Fixed default.
    pub typical_transposition: Unmodeled<i8>,
}

impl Motif {
    fn new(intervals: Vec<Interval>, frequency: u32) -> Self {
        Motif {
            intervals,
            frequency,
            typical_entry_offset: Unmodeled(DEFAULT_ENTRY_OFFSET),
            typical_transposition: Unmodeled(DEFAULT_TRANSPOSITION),
        }
    }
}

/// Ranked library of motifs extracted from the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotifLibrary {
    pub motifs: Vec<Motif>,
}

impl MotifLibrary {
    /// Load from JSON, rejecting libraries this crate could not have written.
    pub fn load(path: &Path) -> Result<Self> {
        let library: MotifLibrary = artifact::read_json(path)?;
        library
            .validate()
            .map_err(|reason| CorpusError::InvalidArtifact {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(library)
    }

    /// Check intervals are within the melodic clamp range, frequencies are
    /// non-increasing, and the placeholders still hold their fixed defaults.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, motif) in self.motifs.iter().enumerate() {
            if motif.intervals.is_empty() {
                return Err(format!("motif {i} has no intervals"));
            }
            if let Some(iv) = motif.intervals.iter().find(|&&iv| !MELODIC_RANGE.contains(iv)) {
                return Err(format!("motif {i} interval {iv} outside melodic range"));
            }
            if motif.typical_entry_offset != Unmodeled(DEFAULT_ENTRY_OFFSET)
                || motif.typical_transposition != Unmodeled(DEFAULT_TRANSPOSITION)
            {
                return Err(format!("motif {i} placeholder fields differ from defaults"));
            }
        }
        if let Some(i) = self
            .motifs
            .windows(2)
            .position(|w| w[0].frequency < w[1].frequency)
        {
            return Err(format!("motif {i} ranked above a more frequent motif"));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        artifact::write_json(path, self)
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Mining
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
struct NGramStats {
    count: u32,
    groups: FxHashSet<usize>,
}

/// An n-gram that passed both filters, before ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Candidate {
    key: IntervalKey,
    frequency: u32,
    groups: usize,
}

/// Partial n-gram counts for one slice of the corpus.
#[derive(Clone, Debug, Default)]
struct NGramCounts {
    ngrams: FxHashMap<IntervalKey, NGramStats>,
}

impl NGramCounts {
    fn observe(&mut self, group: usize, raw: &[i32], config: &MotifConfig) {
        let intervals = MELODIC_RANGE.clamp_all(raw);
        for length in config.min_length.max(1)..=config.max_length {
            for window in intervals.windows(length) {
                let stats = self.ngrams.entry(IntervalKey::new(window)).or_default();
                stats.count = stats.count.saturating_add(1);
                stats.groups.insert(group);
            }
        }
    }

    fn merge(self, other: NGramCounts) -> NGramCounts {
        let (mut big, small) = if self.ngrams.len() >= other.ngrams.len() {
            (self.ngrams, other.ngrams)
        } else {
            (other.ngrams, self.ngrams)
        };
        for (key, stats) in small {
            let entry = big.entry(key).or_default();
            entry.count = entry.count.saturating_add(stats.count);
            entry.groups.extend(stats.groups);
        }
        NGramCounts { ngrams: big }
    }

    /// Apply the frequency and coverage filters, then rank.
    fn finish(self, config: &MotifConfig) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .ngrams
            .into_iter()
            .filter(|(_, s)| {
                s.count >= config.min_frequency && s.groups.len() >= config.min_pieces
            })
            .map(|(key, s)| Candidate {
                key,
                frequency: s.count,
                groups: s.groups.len(),
            })
            .collect();
        candidates.sort_unstable_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.key.cmp(&b.key))
        });
        candidates.truncate(config.library_size);
        candidates
    }
}

/// `voice_index` counts only voices that have at least one interval.
fn piece_group(grouping: PieceGrouping, voice_index: usize, voice: &VoiceSequence<'_>) -> usize {
    match grouping {
        PieceGrouping::Explicit => voice.piece.0,
        PieceGrouping::FixedVoiceCount(n) => voice_index / n.max(1),
    }
}

fn mine_candidates(voices: &[VoiceSequence<'_>], config: &MotifConfig) -> Vec<Candidate> {
    // Empty parts never take a sequential voice index, so they cannot shift
    // the fixed-voice-count groups of the voices after them.
    let voiced: Vec<&VoiceSequence<'_>> =
        voices.iter().filter(|v| !v.intervals.is_empty()).collect();
    voiced
        .par_iter()
        .enumerate()
        .fold(NGramCounts::default, |mut acc, (i, voice)| {
            let group = piece_group(config.grouping, i, voice);
            acc.observe(group, voice.intervals, config);
            acc
        })
        .reduce(NGramCounts::default, NGramCounts::merge)
        .finish(config)
}

/// Mine the ranked motif library from every voice's melodic sequence.
///
/// `voices` must be in corpus order: `FixedVoiceCount` grouping relies on
/// the sequential index of the non-empty voices.
pub fn mine_motifs(voices: &[VoiceSequence<'_>], config: &MotifConfig) -> MotifLibrary {
    let motifs = mine_candidates(voices, config)
        .into_iter()
        .map(|c| {
            debug!("motif {} (freq: {}, pieces: {})", c.key, c.frequency, c.groups);
            Motif::new(c.key.to_vec(), c.frequency)
        })
        .collect();
    MotifLibrary { motifs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::PieceId;

    fn exact_length(length: usize) -> MotifConfig {
        MotifConfig {
            min_length: length,
            max_length: length,
            ..MotifConfig::default()
        }
    }

    fn voices<'a>(input: &'a [(usize, Vec<i32>)]) -> Vec<VoiceSequence<'a>> {
        input
            .iter()
            .map(|(piece, ivs)| VoiceSequence {
                piece: PieceId(*piece),
                intervals: ivs,
            })
            .collect()
    }

    #[test]
    fn test_single_piece_repetition_is_excluded() {
        // (1,1,1,1) occurs 5 times, all in piece 0.
        let input = vec![(0, vec![1; 8]), (1, vec![-2, 3, 1, -2])];
        let library = mine_motifs(&voices(&input), &exact_length(4));
        assert!(library.is_empty());
    }

    #[test]
    fn test_three_occurrences_across_two_pieces_is_included() {
        let input = vec![
            (0, vec![1; 8]),
            (1, vec![2, 3, 4, 5]),
            (1, vec![2, 3, 4, 5]),
            (2, vec![2, 3, 4, 5]),
        ];
        let candidates = mine_candidates(&voices(&input), &exact_length(4));
        assert_eq!(
            candidates,
            vec![Candidate {
                key: IntervalKey::new(&[2, 3, 4, 5]),
                frequency: 3,
                groups: 2,
            }]
        );
    }

    #[test]
    fn test_frequency_threshold_applies_with_coverage() {
        // Two pieces, but only two occurrences in total.
        let input = vec![(0, vec![2, 3, 4, 5]), (1, vec![2, 3, 4, 5])];
        assert!(mine_motifs(&voices(&input), &exact_length(4)).is_empty());
    }

    #[test]
    fn test_library_is_bounded_and_ranked() {
        let mut input = Vec::new();
        for k in 0..60i32 {
            let ngram = vec![k / 10, k % 10, 9, 9];
            let frequency = 3 + (k % 7);
            input.push((0, ngram.clone()));
            for _ in 1..frequency {
                input.push((1, ngram.clone()));
            }
        }
        let library = mine_motifs(&voices(&input), &exact_length(4));
        assert_eq!(library.len(), 50);
        assert!(
            library
                .motifs
                .windows(2)
                .all(|w| w[0].frequency >= w[1].frequency)
        );
        assert_eq!(library.motifs[0].frequency, 9);
    }

    #[test]
    fn test_ties_break_by_interval_order() {
        let input = vec![
            (0, vec![5, 5, 5, 5]),
            (1, vec![5, 5, 5, 5]),
            (2, vec![5, 5, 5, 5]),
            (0, vec![-1, 0, 0, 0]),
            (1, vec![-1, 0, 0, 0]),
            (2, vec![-1, 0, 0, 0]),
        ];
        let library = mine_motifs(&voices(&input), &exact_length(4));
        let intervals: Vec<&[Interval]> =
            library.motifs.iter().map(|m| m.intervals.as_slice()).collect();
        assert_eq!(intervals, vec![&[-1, 0, 0, 0][..], &[5, 5, 5, 5]]);
    }

    #[test]
    fn test_all_lengths_in_range_are_mined() {
        let phrase = vec![2, 2, 1, 2, -2, -2];
        let input = vec![(0, phrase.clone()), (1, phrase.clone()), (2, phrase)];
        let config = MotifConfig {
            min_length: 4,
            max_length: 6,
            ..MotifConfig::default()
        };
        let library = mine_motifs(&voices(&input), &config);
        // Three 4-grams, two 5-grams, one 6-gram, each seen 3 times.
        assert_eq!(library.len(), 6);
        assert!(library.motifs.iter().all(|m| m.frequency == 3));
        assert!(library.motifs.iter().any(|m| m.intervals == vec![2, 2, 1, 2, -2, -2]));
    }

    #[test]
    fn test_short_sequences_contribute_nothing() {
        let input = vec![(0, vec![1, 2, 3]), (1, vec![1, 2, 3]), (2, vec![1, 2, 3])];
        assert!(mine_motifs(&voices(&input), &MotifConfig::default()).is_empty());
    }

    #[test]
    fn test_ngrams_are_clamped() {
        let input = vec![
            (0, vec![40, 24, 30, 24]),
            (1, vec![24, 24, 24, 99]),
            (2, vec![24, 24, 24, 24]),
        ];
        let library = mine_motifs(&voices(&input), &exact_length(4));
        assert_eq!(library.motifs[0].intervals, vec![24, 24, 24, 24]);
        assert_eq!(library.motifs[0].frequency, 3);
    }

    #[test]
    fn test_fixed_voice_count_grouping() {
        // One piece with eight voices. Explicit grouping sees one piece; the
        // four-voice approximation splits it into two groups.
        let input: Vec<(usize, Vec<i32>)> = (0..8).map(|_| (0, vec![2, -1, 2, -1])).collect();
        let explicit = mine_motifs(&voices(&input), &exact_length(4));
        assert!(explicit.is_empty());

        let legacy = MotifConfig {
            grouping: PieceGrouping::FixedVoiceCount(4),
            ..exact_length(4)
        };
        let library = mine_motifs(&voices(&input), &legacy);
        assert_eq!(library.len(), 1);
        assert_eq!(library.motifs[0].frequency, 8);
    }

    #[test]
    fn test_fixed_voice_count_skips_empty_parts() {
        // Piece 0 has an empty third part. Counting only voiced parts, the
        // first three voices of piece 1 get indices 3, 4, 5, so (7,7,7,7)
        // spans groups 0 and 1 under four-voice grouping.
        let m = vec![2, -1, -2, 1];
        let input = vec![
            (0, m.clone()),
            (0, m),
            (0, vec![]),
            (0, vec![5, 5, 5, 5]),
            (1, vec![7, 7, 7, 7]),
            (1, vec![7, 7, 7, 7]),
            (1, vec![7, 7, 7, 7]),
            (1, vec![9, 9, 9, 9]),
        ];
        let config = MotifConfig {
            grouping: PieceGrouping::FixedVoiceCount(4),
            ..exact_length(4)
        };
        let candidates = mine_candidates(&voices(&input), &config);
        assert_eq!(
            candidates,
            vec![Candidate {
                key: IntervalKey::new(&[7, 7, 7, 7]),
                frequency: 3,
                groups: 2,
            }]
        );
    }

    #[test]
    fn test_validate_rejects_tampered_libraries() {
        let good = MotifLibrary {
            motifs: vec![Motif::new(vec![2, 2, 1, 2], 9), Motif::new(vec![-2, -2], 4)],
        };
        assert!(good.validate().is_ok());

        let mut moved = good.clone();
        moved.motifs[0].typical_transposition = Unmodeled(12);
        assert!(moved.validate().is_err());

        let mut wide = good.clone();
        wide.motifs[1].intervals = vec![30, -2];
        assert!(wide.validate().is_err());

        let mut unranked = good;
        unranked.motifs.swap(0, 1);
        assert!(unranked.validate().is_err());
    }

    #[test]
    fn test_load_rejects_changed_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motif_library.json");
        std::fs::write(
            &path,
            r#"{ "motifs": [ { "intervals": [2, 2, 1, 2], "frequency": 5,
                 "typical_entry_offset": 6, "typical_transposition": 7 } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            MotifLibrary::load(&path),
            Err(CorpusError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_placeholders_are_fixed_defaults() {
        let input = vec![
            (0, vec![7, -2, -2, -1]),
            (1, vec![7, -2, -2, -1]),
            (1, vec![7, -2, -2, -1]),
        ];
        let library = mine_motifs(&voices(&input), &exact_length(4));
        let motif = &library.motifs[0];
        assert_eq!(motif.typical_entry_offset, Unmodeled(DEFAULT_ENTRY_OFFSET));
        assert_eq!(*motif.typical_transposition.value(), 7);

        let value = serde_json::to_value(&library).unwrap();
        assert_eq!(value["motifs"][0]["typical_entry_offset"], 8);
        assert_eq!(value["motifs"][0]["typical_transposition"], 7);
        assert_eq!(value["motifs"][0]["frequency"], 3);
    }

    #[test]
    fn test_json_roundtrip_is_lossless() {
        let library = MotifLibrary {
            motifs: vec![
                Motif::new(vec![2, 2, 1, 2], 50),
                Motif::new(vec![-2, -2, -1, -2, -24], 45),
            ],
        };
        let json = serde_json::to_string_pretty(&library).unwrap();
        let restored: MotifLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, library);
    }

    #[test]
    fn test_parallel_mining_matches_single_thread() {
        let input: Vec<(usize, Vec<i32>)> = (0..40)
            .map(|i| (i / 4, (0..30).map(|j| ((i + j) % 5) as i32 - 2).collect()))
            .collect();
        let config = MotifConfig::default();
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let many = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap();
        let v = voices(&input);
        let a = single.install(|| mine_motifs(&v, &config));
        let b = many.install(|| mine_motifs(&v, &config));
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
}
