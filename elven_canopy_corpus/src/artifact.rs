// Artifact files written by a training run and read by the generator.
//
// Two JSON files go into the output directory:
// - `markov_models.json`: `MarkovModels` (see `markov.rs`)
// - `motif_library.json`: `MotifLibrary` (see `motif.rs`)
//
// Files are pretty-printed so they diff well when the corpus changes. All
// counts are integers, so writing and reloading an artifact reproduces it
// exactly.

use crate::error::{CorpusError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const MARKOV_MODELS_FILE: &str = "markov_models.json";
pub const MOTIF_LIBRARY_FILE: &str = "motif_library.json";

/// Locations of both artifacts inside an output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub markov_models: PathBuf,
    pub motif_library: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        ArtifactPaths {
            markov_models: dir.join(MARKOV_MODELS_FILE),
            motif_library: dir.join(MOTIF_LIBRARY_FILE),
        }
    }
}

/// Serialize `value` as pretty JSON into `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CorpusError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| CorpusError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| CorpusError::io(path, e))
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| CorpusError::json(path, e))
}
