//! Persisted set of "already read" markers.
//!
//! Each marker is a CRC-32 of the feed URL bytes immediately followed by the
//! article title bytes. There is no separator between the two fields, so
//! `("ab", "c")` and `("a", "bc")` share a marker, and unrelated pairs can
//! collide on the 32-bit value. Read state is cosmetic, so both are accepted
//! in exchange for four bytes per article on disk.
//!
//! File format: a flat sequence of little-endian `u32` values with no header,
//! count or version.
use std::collections::HashSet;
use std::path::Path;

use super::error::ReadStatusError;
use super::fs::{read_optional, write_private};

const HASH_LEN: usize = 4;

/// Marker for a `(feed_url, title)` pair.
pub fn read_status_hash(feed_url: &str, title: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(feed_url.as_bytes());
    hasher.update(title.as_bytes());
    hasher.finalize()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStatusSet {
    hashes: HashSet<u32>,
}

impl ReadStatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_as_read(&mut self, feed_url: &str, title: &str) {
        self.hashes.insert(read_status_hash(feed_url, title));
    }

    pub fn mark_as_unread(&mut self, feed_url: &str, title: &str) {
        self.hashes.remove(&read_status_hash(feed_url, title));
    }

    pub fn is_read(&self, feed_url: &str, title: &str) -> bool {
        self.hashes.contains(&read_status_hash(feed_url, title))
    }

    /// Flip the state of a pair, returning the new "read" value.
    pub fn toggle(&mut self, feed_url: &str, title: &str) -> bool {
        let hash = read_status_hash(feed_url, title);
        if self.hashes.remove(&hash) {
            false
        } else {
            self.hashes.insert(hash);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode as little-endian `u32`s in ascending order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut hashes: Vec<u32> = self.hashes.iter().copied().collect();
        hashes.sort_unstable();
        hashes.iter().flat_map(|h| h.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReadStatusError> {
        if bytes.len() % HASH_LEN != 0 {
            return Err(ReadStatusError::MalformedPersistedData { len: bytes.len() });
        }

        let hashes = bytes
            .chunks_exact(HASH_LEN)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(Self { hashes })
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Load from `path`. A missing file is an empty set; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ReadStatusError> {
        let bytes = read_optional(path).map_err(|source| ReadStatusError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match bytes {
            Some(bytes) => {
                let set = Self::from_bytes(&bytes)?;
                tracing::debug!(path = %path.display(), entries = set.len(), "Loaded read status");
                Ok(set)
            }
            None => {
                tracing::debug!(path = %path.display(), "No read-status file, starting empty");
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ReadStatusError> {
        write_private(path, &self.to_bytes()).map_err(|source| ReadStatusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), entries = self.len(), "Saved read status");
        Ok(())
    }
}
