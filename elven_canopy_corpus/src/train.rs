// A complete training run: corpus in, artifacts out.
//
// Order of work:
// 1. Validate the config and check the corpus preconditions. No melodic
//    intervals at all is fatal. No harmonic intervals is only fatal when
//    `require_harmonic` is set; otherwise the harmonic model is written
//    empty and a warning is logged. Both checks run before any model is
//    built, so a failed run never leaves artifacts behind.
// 2. Build the melodic model, the harmonic model and the motif library on a
//    dedicated rayon pool (`worker_threads`).
// 3. Log a summary of each (totals, context counts, most common intervals,
//    top motifs).
// 4. `run` additionally reads the corpus from disk first and writes both
//    artifacts at the end.

use crate::artifact::ArtifactPaths;
use crate::config::{PieceGrouping, TrainingConfig};
use crate::corpus::{Corpus, CorpusReader};
use crate::counts::CountTable;
use crate::error::{CorpusError, Result};
use crate::interval::Interval;
use crate::markov::{
    HarmonicModel, MAX_MELODIC_ORDER, MarkovModels, MelodicModel, build_harmonic_model,
    build_melodic_model,
};
use crate::motif::{MotifLibrary, mine_motifs};
use log::{info, warn};
use std::path::Path;

/// Everything a training run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedArtifacts {
    pub models: MarkovModels,
    pub motifs: MotifLibrary,
}

impl TrainedArtifacts {
    /// Write both artifacts into `dir` (created if missing).
    pub fn write(&self, dir: &Path) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths::in_dir(dir);
        self.models.save(&paths.markov_models)?;
        info!("Wrote Markov models to {}", paths.markov_models.display());
        self.motifs.save(&paths.motif_library)?;
        info!("Wrote motif library to {}", paths.motif_library.display());
        Ok(paths)
    }
}

/// Fail fast on a corpus nothing useful can be trained from.
pub fn check_preconditions(corpus: &Corpus, config: &TrainingConfig) -> Result<()> {
    info!(
        "Corpus: {} pieces, {} voice parts, {} voice pairs",
        corpus.pieces.len(),
        corpus.num_voices(),
        corpus.num_voice_pairs()
    );
    if corpus.melodic_observations() == 0 {
        return Err(CorpusError::EmptyMelodicCorpus);
    }
    if corpus.harmonic_observations() == 0 {
        if config.require_harmonic {
            return Err(CorpusError::EmptyHarmonicCorpus);
        }
        warn!("No harmonic intervals in corpus; harmonic model will be empty");
    }
    Ok(())
}

/// Build all models from an in-memory corpus.
pub fn train(corpus: &Corpus, config: &TrainingConfig) -> Result<TrainedArtifacts> {
    config.validate()?;
    check_preconditions(corpus, config)?;

    if let PieceGrouping::FixedVoiceCount(n) = config.motif.grouping {
        warn!("Motif piece groups approximated as every {n} consecutive voices");
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = config.worker_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let melodic_sequences = corpus.melodic_sequences();
    let harmonic_sequences = corpus.harmonic_sequences();
    let voices = corpus.voice_sequences();

    let artifacts = pool.install(|| {
        info!("Building melodic Markov model...");
        let melodic = build_melodic_model(&melodic_sequences);
        log_melodic_summary(&melodic);

        info!("Building harmonic Markov model...");
        let harmonic = build_harmonic_model(&harmonic_sequences);
        log_harmonic_summary(&harmonic);

        info!("Extracting motifs...");
        let motifs = mine_motifs(&voices, &config.motif);
        log_motif_summary(&motifs);

        TrainedArtifacts {
            models: MarkovModels { melodic, harmonic },
            motifs,
        }
    });
    Ok(artifacts)
}

/// Read a corpus from `corpus_path`, train, and write the artifacts into
/// `output_dir`.
pub fn run(corpus_path: &Path, output_dir: &Path, config: &TrainingConfig) -> Result<ArtifactPaths> {
    let (corpus, summary) = CorpusReader::new()
        .with_max_pieces(config.max_pieces)
        .read(corpus_path)?;
    if summary.skipped > 0 {
        warn!("{} pieces skipped while reading the corpus", summary.skipped);
    }
    let artifacts = train(&corpus, config)?;
    artifacts.write(output_dir)
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Entries of a count table, most frequent first.
fn ranked(table: &CountTable) -> Vec<(Interval, u32)> {
    let mut entries: Vec<(Interval, u32)> = table.iter().map(|(&iv, &n)| (iv, n)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries
}

fn percent(count: u32, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Conventional name of an interval class (semitones mod 12).
pub fn interval_class_name(interval: Interval) -> &'static str {
    match interval.unsigned_abs() % 12 {
        0 => "P1/P8",
        1 => "m2",
        2 => "M2",
        3 => "m3",
        4 => "M3",
        5 => "P4",
        6 => "TT",
        7 => "P5",
        8 => "m6",
        9 => "M6",
        10 => "m7",
        _ => "M7",
    }
}

fn log_melodic_summary(model: &MelodicModel) {
    let total = model.total_observations();
    info!("  Total melodic transitions: {total}");
    for order in 1..=MAX_MELODIC_ORDER {
        let contexts = model.order(order).map_or(0, |t| t.len());
        info!("  Order-{order} contexts: {contexts}");
    }
    info!("  Top 10 intervals:");
    for (iv, count) in ranked(&model.order0).into_iter().take(10) {
        info!("    {iv:+3} semitones: {:5.1}%", percent(count, total));
    }
}

fn log_harmonic_summary(model: &HarmonicModel) {
    let total = model.total_observations();
    info!("  Total harmonic observations: {total}");
    info!("  Transition contexts: {}", model.transitions.len());
    info!("  Top 10 harmonic intervals:");
    for (iv, count) in ranked(&model.unigram).into_iter().take(10) {
        info!(
            "    {iv:+3} ({}): {:5.1}%",
            interval_class_name(iv),
            percent(count, total)
        );
    }
}

fn log_motif_summary(library: &MotifLibrary) {
    info!("  Found {} motifs meeting criteria.", library.len());
    if library.is_empty() {
        return;
    }
    info!("  Top 5 motifs:");
    for motif in library.motifs.iter().take(5) {
        let intervals: Vec<String> = motif.intervals.iter().map(|iv| format!("{iv:+}")).collect();
        info!(
            "    [{}] (freq: {})",
            intervals.join(" "),
            motif.frequency
        );
    }
}
