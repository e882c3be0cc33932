use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::downloads::DownloadStore;
use super::{CacheError, CacheOptions};
use crate::feed::{sort_by_published_with, Article, FeedFetcher, TimelineOrder};

/// Articles of one feed plus the moment they stop being served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub expire: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expire > now
    }
}

/// Per-URL feed cache with TTL expiry and earliest-expiry eviction.
///
/// Lookups that hit an unexpired entry never reach the fetcher. Misses,
/// expired entries and forced refreshes call the fetcher unless offline mode
/// is on, in which case they fail with [`CacheError::Offline`].
///
/// Capacity is enforced before inserting a new key: while the cache is full,
/// the entry with the earliest expiry is removed. The scan is linear, which is
/// fine for the intended size of around a hundred feeds.
pub struct FeedCache<F, C = SystemClock> {
    fetcher: F,
    clock: C,
    pub(super) entries: HashMap<String, CacheEntry>,
    pub(super) downloaded: DownloadStore,
    capacity: usize,
    ttl: TimeDelta,
    offline: bool,
    order: TimelineOrder,
}

impl<F: FeedFetcher> FeedCache<F, SystemClock> {
    /// Cache backed by the system clock.
    pub fn new(fetcher: F, options: CacheOptions) -> Self {
        Self::with_clock(fetcher, options, SystemClock)
    }
}

impl<F: FeedFetcher, C: Clock> FeedCache<F, C> {
    /// Cache reading time from `clock`. A capacity of 0 is raised to 1.
    pub fn with_clock(fetcher: F, options: CacheOptions, clock: C) -> Self {
        if options.capacity == 0 {
            tracing::warn!("Cache capacity of 0 requested, using 1");
        }
        let ttl = TimeDelta::from_std(options.ttl).unwrap_or(TimeDelta::MAX);

        Self {
            fetcher,
            clock,
            entries: HashMap::new(),
            downloaded: DownloadStore::new(),
            capacity: options.capacity.max(1),
            ttl,
            offline: options.offline,
            order: options.order,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Articles for `url`, from cache when fresh, otherwise from the fetcher.
    ///
    /// A failed fetch leaves any existing entry for `url` (and every other
    /// entry) exactly as it was.
    pub async fn get_articles(
        &mut self,
        url: &str,
        force_refresh: bool,
    ) -> Result<Vec<Article>, CacheError> {
        if !force_refresh {
            if let Some(entry) = self.entries.get(url) {
                if entry.is_fresh(self.clock.now()) {
                    tracing::trace!(url = %url, "Cache hit");
                    return Ok(entry.articles.clone());
                }
            }
        }

        if self.offline {
            tracing::debug!(url = %url, force_refresh, "Offline, refusing to fetch");
            return Err(CacheError::Offline);
        }

        let articles = match self.fetcher.fetch(url).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Feed fetch failed, cache left unchanged");
                return Err(CacheError::Fetch(e));
            }
        };

        let expire = self.expiry_from(self.clock.now());
        if !self.entries.contains_key(url) {
            self.make_room();
        }
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                expire,
                articles: articles.clone(),
            },
        );
        tracing::debug!(url = %url, articles = articles.len(), expire = %expire, "Cached feed");

        Ok(articles)
    }

    /// Merged timeline of every feed in `urls`.
    ///
    /// Each feed goes through [`get_articles`](Self::get_articles) without a
    /// forced refresh. Feeds that fail are logged and contribute nothing; the
    /// rest are concatenated and stably sorted by publication date.
    pub async fn get_articles_bulk<I, S>(&mut self, urls: I) -> Vec<Article>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.get_timeline(urls)
            .await
            .into_iter()
            .map(|(_, article)| article)
            .collect()
    }

    /// Like [`get_articles_bulk`](Self::get_articles_bulk), but each article
    /// is paired with the URL of the feed it came from.
    ///
    /// Guids are only unique within one feed, so this is the way to tell
    /// which feed an article in a merged timeline belongs to.
    pub async fn get_timeline<I, S>(&mut self, urls: I) -> Vec<(String, Article)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut timeline = Vec::new();
        let mut failed = 0usize;

        for url in urls {
            let url = url.as_ref();
            match self.get_articles(url, false).await {
                Ok(articles) => {
                    timeline.extend(articles.into_iter().map(|a| (url.to_string(), a)))
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(url = %url, error = %e, "Skipping feed in timeline");
                }
            }
        }

        if failed > 0 {
            tracing::info!(failed, articles = timeline.len(), "Timeline built with failed feeds");
        }

        sort_by_published_with(&mut timeline, self.order, |(_, article)| article);
        timeline
    }

    // ========================================================================
    // Downloads
    // ========================================================================

    /// Copy article `index` of feed `url` into the download list.
    ///
    /// The index refers to the feed's current article list, so this performs
    /// a normal lookup first (and may fetch).
    pub async fn add_to_downloaded(&mut self, url: &str, index: usize) -> Result<(), CacheError> {
        let mut articles = self.get_articles(url, false).await?;
        if index >= articles.len() {
            return Err(CacheError::IndexOutOfRange {
                index,
                len: articles.len(),
            });
        }
        let article = articles.swap_remove(index);
        tracing::debug!(url = %url, title = %article.title, "Saved article to downloads");
        self.downloaded.push(article);
        Ok(())
    }

    /// Remove the download at `index`, counted in insertion order.
    pub fn remove_from_downloaded(&mut self, index: usize) -> Result<Article, CacheError> {
        self.downloaded.remove(index)
    }

    /// Downloaded articles sorted by publication date.
    pub fn get_downloaded(&self) -> Vec<Article> {
        self.downloaded.sorted(self.order)
    }

    /// The download list in insertion order, as indexed by
    /// [`remove_from_downloaded`](Self::remove_from_downloaded).
    pub fn downloads(&self) -> &DownloadStore {
        &self.downloaded
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drop every entry whose expiry is not in the future.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before - self.entries.len()
    }

    /// Forget the entry for `url`. Returns whether one existed.
    pub fn invalidate(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    /// Evict by earliest expiry until the cache is within capacity.
    pub(super) fn shrink_to_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            if self.evict_earliest().is_none() {
                break;
            }
        }
    }

    // Evict until one more key fits.
    fn make_room(&mut self) {
        while self.entries.len() >= self.capacity {
            if self.evict_earliest().is_none() {
                break;
            }
        }
    }

    fn evict_earliest(&mut self) -> Option<String> {
        // Ties on expiry go to the lexicographically smallest URL so eviction is deterministic.
        let victim = self
            .entries
            .iter()
            .min_by(|(url_a, a), (url_b, b)| a.expire.cmp(&b.expire).then_with(|| url_a.cmp(url_b)))
            .map(|(url, _)| url.clone())?;

        self.entries.remove(&victim);
        tracing::debug!(url = %victim, capacity = self.capacity, "Evicted cache entry");
        Some(victim)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of cached feeds, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry exists for `url`, regardless of expiry.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Expiry of the entry for `url`, if cached.
    pub fn expires_at(&self, url: &str) -> Option<DateTime<Utc>> {
        self.entries.get(url).map(|entry| entry.expire)
    }

    /// Cached URLs in no particular order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Effective capacity, never below 1.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Toggle offline mode at runtime. Cached entries are kept either way.
    pub fn set_offline(&mut self, offline: bool) {
        if self.offline != offline {
            tracing::info!(offline, "Offline mode changed");
        }
        self.offline = offline;
    }

    pub fn order(&self) -> TimelineOrder {
        self.order
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
