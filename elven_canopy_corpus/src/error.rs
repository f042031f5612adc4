// Error type for corpus loading, training, and artifact I/O.
//
// Per-piece read failures in directory mode never reach this type: the
// corpus reader logs and skips them. Everything here aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact {} is not a valid training output: {reason}", .path.display())]
    InvalidArtifact { path: PathBuf, reason: String },
    #[error("no melodic intervals in corpus; cannot build a model")]
    EmptyMelodicCorpus,
    #[error("no harmonic intervals in corpus and require_harmonic is set")]
    EmptyHarmonicCorpus,
    #[error("invalid training config: {0}")]
    InvalidConfig(String),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CorpusError::Json {
            path: path.into(),
            source,
        }
    }
}
