use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or save the cache document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to access cache file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache file '{}' is corrupt: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to load or save the read-status set.
#[derive(Debug, Error)]
pub enum ReadStatusError {
    #[error("Failed to access read-status file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted data is not a whole number of 4-byte hashes.
    #[error("Malformed read-status data: {len} bytes is not a multiple of 4")]
    MalformedPersistedData { len: usize },
}
