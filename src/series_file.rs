//! Series artifact persistence
//!
//! Resolved episode lists are written to a JSON document for inspection and
//! resuming. The pipeline never reads this file back itself.

use crate::episode_list::ParsedEpisode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name of the series artifact inside the output directory
pub const SERIES_FILE_NAME: &str = "series_info.json";

/// Errors that can occur while reading or writing the series artifact
#[derive(Debug, Error)]
pub enum SeriesFileError {
    /// Failed to write the artifact
    #[error("Failed to write series file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the artifact
    #[error("Failed to read series file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The artifact is not valid JSON or has the wrong shape
    #[error("Failed to deserialize series file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The recorded count disagrees with the number of episodes
    #[error("Series file {path} records {count} episodes but contains {actual}")]
    CountMismatch {
        path: PathBuf,
        count: usize,
        actual: usize,
    },

    /// Failed to serialize the episode list
    #[error("Failed to serialize episodes: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SeriesDocument<'a> {
    count: usize,
    episodes: &'a [ParsedEpisode],
}

#[derive(Deserialize)]
struct StoredSeriesDocument {
    count: usize,
    /// Older writers emitted `null` for an empty list
    episodes: Option<Vec<ParsedEpisode>>,
}

/// Writes an episode list to `path` as pretty-printed JSON
///
/// The document has the shape `{"count": N, "episodes": [...]}`.
pub fn save_series(episodes: &[ParsedEpisode], path: &Path) -> Result<(), SeriesFileError> {
    let document = SeriesDocument {
        count: episodes.len(),
        episodes,
    };

    let mut content = serde_json::to_string_pretty(&document)?;
    content.push('\n');

    fs::write(path, content).map_err(|e| SeriesFileError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), count = episodes.len(), "series file saved");
    Ok(())
}

/// Reads an episode list previously written by [`save_series`]
///
/// Episodes are returned in the order they were stored.
pub fn load_series(path: &Path) -> Result<Vec<ParsedEpisode>, SeriesFileError> {
    let content = fs::read_to_string(path).map_err(|e| SeriesFileError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let document: StoredSeriesDocument =
        serde_json::from_str(&content).map_err(|e| SeriesFileError::DeserializationFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let episodes = document.episodes.unwrap_or_default();
    if episodes.len() != document.count {
        return Err(SeriesFileError::CountMismatch {
            path: path.to_path_buf(),
            count: document.count,
            actual: episodes.len(),
        });
    }

    Ok(episodes)
}
