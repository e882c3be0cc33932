//! In-memory feed cache with expiry-driven eviction, timeline aggregation and
//! the saved-articles list.
//!
//! The cache has exactly one owner. Every mutating call takes `&mut self`, so
//! lookups, evictions and inserts are whole-structure transitions. Embedders
//! that need shared access go through [`crate::service::CacheService`].

mod clock;
mod downloads;
mod persist;
mod store;

use std::time::Duration;

use thiserror::Error;

use crate::feed::{FetchError, TimelineOrder};

pub use clock::{Clock, ManualClock, SystemClock};
pub use downloads::DownloadStore;
pub use store::{CacheEntry, FeedCache};

/// Default maximum number of cached feeds.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default lifetime of a cache entry (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CacheError {
    /// Offline mode is on and the request could not be served from cache.
    #[error("Offline: feed is not available in the cache")]
    Offline,

    /// The feed fetcher failed; the cached entry (if any) is unchanged.
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    /// Position outside an article list.
    #[error("Index {index} is out of range for a list of {len} articles")]
    IndexOutOfRange { index: usize, len: usize },

    /// The owning cache task has stopped and can no longer answer requests.
    #[error("Cache service has stopped")]
    ServiceStopped,
}

impl CacheError {
    /// True for the offline short-circuit, so callers can render a distinct message.
    pub fn is_offline(&self) -> bool {
        matches!(self, CacheError::Offline)
    }
}

// ============================================================================
// Options
// ============================================================================

/// Construction-time settings for a [`FeedCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of feed entries. Values below 1 are treated as 1.
    pub capacity: usize,
    /// How long a freshly fetched entry stays valid.
    pub ttl: Duration,
    /// Start in offline mode (no fetches at all).
    pub offline: bool,
    /// Sort direction for bulk timelines and the download list.
    pub order: TimelineOrder,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
            offline: false,
            order: TimelineOrder::default(),
        }
    }
}
