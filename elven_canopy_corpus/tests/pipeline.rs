// End-to-end training run over a corpus directory on disk.
//
// Writes a handful of per-piece JSON files (one of them corrupt), runs the
// full pipeline into a temp output directory, reloads both artifacts, and
// checks the properties the generator relies on: count invariants, pruning,
// clamping, motif filtering and ranking, and lossless reload.

use std::path::Path;

use elven_canopy_corpus::counts::table_total;
use elven_canopy_corpus::interval::IntervalKey;
use elven_canopy_corpus::markov::MAX_MELODIC_ORDER;
use elven_canopy_corpus::motif::{DEFAULT_ENTRY_OFFSET, DEFAULT_TRANSPOSITION};
use elven_canopy_corpus::{
    CorpusError, CorpusReader, MarkovModels, MotifLibrary, Piece, TrainingConfig,
    VoiceLine, run, train,
};

/// Descending-then-recovering figure shared by every piece.
const SHARED: [i32; 8] = [-2, -2, -1, -2, 5, 2, 1, 2];

fn write_piece(dir: &Path, file: &str, voices: Vec<Vec<i32>>, pairs: Vec<Vec<i32>>) {
    let piece = Piece {
        name: file.trim_end_matches(".json").into(),
        voices: voices.into_iter().map(VoiceLine::new).collect(),
        voice_pairs: pairs,
    };
    std::fs::write(dir.join(file), serde_json::to_string_pretty(&piece).unwrap()).unwrap();
}

fn write_corpus(dir: &Path) {
    // Piece 1 repeats its own theme many times; it should never become a motif.
    let theme: Vec<i32> = [3, 3, -4, 9].iter().cycle().take(40).copied().collect();
    let mut soprano = SHARED.to_vec();
    soprano.extend([40, -2, 2]);
    write_piece(
        dir,
        "01_missa_brevis.json",
        vec![soprano, theme, vec![2, 2, -4, 1, 1, 2]],
        vec![vec![7, 4, 3, -50, 7, 4], vec![12, 7, 12, 5]],
    );
    write_piece(
        dir,
        "02_sicut_cervus.json",
        vec![SHARED.to_vec(), vec![-1, 2, -1, 2, -3]],
        vec![vec![4, 3, 4, 7, 8]],
    );
    std::fs::write(dir.join("03_broken.json"), "{\"voices\": [ {\"intervals\": [1, ").unwrap();
    write_piece(
        dir,
        "04_stabat_mater.json",
        vec![vec![1, 1].into_iter().chain(SHARED).collect()],
        vec![],
    );
}

#[test]
fn full_pipeline_roundtrip() {
    let root = tempfile::tempdir().unwrap();
    let corpus_dir = root.path().join("corpus");
    std::fs::create_dir(&corpus_dir).unwrap();
    write_corpus(&corpus_dir);

    let (corpus, summary) = CorpusReader::new().read(&corpus_dir).unwrap();
    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.skipped, 1);

    let out = root.path().join("data");
    let paths = run(&corpus_dir, &out, &TrainingConfig::default()).unwrap();
    let models = MarkovModels::load(&paths.markov_models).unwrap();
    let library = MotifLibrary::load(&paths.motif_library).unwrap();

    // Reloaded artifacts equal a fresh in-memory build.
    let fresh = train(&corpus, &TrainingConfig::default()).unwrap();
    assert_eq!(models, fresh.models);
    assert_eq!(library, fresh.motifs);

    // Order-0 covers every melodic interval; +40 was recorded as +24.
    assert_eq!(
        models.melodic.total_observations(),
        corpus.melodic_observations() as u64
    );
    assert!(models.melodic.order0.contains_key(&24));
    assert!(!models.melodic.order0.contains_key(&40));
    assert_eq!(models.harmonic.unigram[&-36], 1);

    // Pruning holds everywhere.
    for order in 1..=MAX_MELODIC_ORDER {
        for table in models.melodic.order(order).unwrap().values() {
            assert!(table.len() >= 2);
        }
    }
    for table in models.harmonic.transitions.values() {
        assert!(table.len() >= 2);
    }

    // Context (-2) is followed three times in each copy of the shared
    // figure, and once more after the clamped leap in piece 1.
    let after_step_down = models.melodic.continuations(&[-2]).unwrap();
    assert_eq!(table_total(after_step_down), 10);
    assert_eq!(after_step_down[&5], 3);
    assert_eq!(after_step_down[&2], 1);

    // The repeated theme of piece 1 is frequent but single-piece.
    assert!(
        library
            .motifs
            .iter()
            .all(|m| IntervalKey::new(&m.intervals) != IntervalKey::new(&[3, 3, -4, 9]))
    );
    // The shared figure is in all three pieces.
    let shared: Vec<i8> = SHARED.iter().map(|&iv| iv as i8).collect();
    let top = library
        .motifs
        .iter()
        .find(|m| m.intervals == shared)
        .unwrap();
    assert_eq!(top.frequency, 3);
    assert_eq!(*top.typical_entry_offset.value(), DEFAULT_ENTRY_OFFSET);
    assert_eq!(*top.typical_transposition.value(), DEFAULT_TRANSPOSITION);

    assert!(library.len() <= 50);
    assert!(
        library
            .motifs
            .windows(2)
            .all(|w| w[0].frequency >= w[1].frequency)
    );
}

#[test]
fn empty_corpus_directory_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let corpus_dir = root.path().join("corpus");
    std::fs::create_dir(&corpus_dir).unwrap();
    std::fs::write(corpus_dir.join("bad.json"), "nope").unwrap();

    let out = root.path().join("data");
    let err = run(&corpus_dir, &out, &TrainingConfig::default()).unwrap_err();
    assert!(matches!(err, CorpusError::EmptyMelodicCorpus));
    assert!(!out.exists());
}

#[test]
fn max_pieces_limits_training() {
    let root = tempfile::tempdir().unwrap();
    write_corpus(root.path());
    let config = TrainingConfig {
        max_pieces: Some(1),
        ..TrainingConfig::default()
    };
    let out = root.path().join("data");
    let paths = run(root.path(), &out, &config).unwrap();
    let models = MarkovModels::load(&paths.markov_models).unwrap();
    // Only 01_missa_brevis: 11 + 40 + 6 melodic intervals.
    assert_eq!(models.melodic.total_observations(), 57);
    // One piece can never satisfy the two-piece coverage rule.
    let library = MotifLibrary::load(&paths.motif_library).unwrap();
    assert!(library.is_empty());
}
