use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::downloads::DownloadStore;
use super::store::{CacheEntry, FeedCache};
use crate::feed::FeedFetcher;
use crate::storage::{read_optional, write_private, PersistError};

/// Shape of the cache file: `{ "content": { url: entry }, "downloaded": [...] }`.
#[derive(Serialize)]
struct CacheDocumentRef<'a> {
    content: &'a HashMap<String, CacheEntry>,
    downloaded: &'a DownloadStore,
}

#[derive(Deserialize)]
struct CacheDocument {
    #[serde(default)]
    content: HashMap<String, CacheEntry>,
    #[serde(default)]
    downloaded: DownloadStore,
}

impl<F: FeedFetcher, C: Clock> FeedCache<F, C> {
    /// Replace the in-memory entries and downloads with the contents of `path`.
    ///
    /// - Missing or empty file → empty cache, `Ok`
    /// - Expired entries are dropped before returning
    /// - Entries beyond capacity are evicted by earliest expiry
    /// - Unreadable or corrupt file → `Err`, in-memory state untouched
    pub fn load(&mut self, path: &Path) -> Result<(), PersistError> {
        let bytes = read_optional(path).map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let document = match bytes {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice::<CacheDocument>(&bytes).map_err(|source| {
                    PersistError::Json {
                        path: path.to_path_buf(),
                        source,
                    }
                })?
            }
            _ => {
                tracing::debug!(path = %path.display(), "No cache file, starting empty");
                CacheDocument {
                    content: HashMap::new(),
                    downloaded: DownloadStore::new(),
                }
            }
        };

        self.entries = document.content;
        self.downloaded = document.downloaded;
        let purged = self.purge_expired();
        self.shrink_to_capacity();

        tracing::info!(
            path = %path.display(),
            entries = self.len(),
            purged,
            downloaded = self.downloaded.len(),
            "Loaded feed cache"
        );
        Ok(())
    }

    /// Write entries and downloads to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let document = CacheDocumentRef {
            content: &self.entries,
            downloaded: &self.downloaded,
        };
        let json = serde_json::to_vec(&document).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        write_private(path, &json).map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            entries = self.len(),
            downloaded = self.downloaded.len(),
            bytes = json.len(),
            "Saved feed cache"
        );
        Ok(())
    }
}
