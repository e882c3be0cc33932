//! Integration tests for the feed cache lifecycle: TTL, eviction, offline mode,
//! bulk timelines against a real HTTP server, and persistence across restarts.
//!
//! Each test builds its own cache and temp directory for isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tidings::cache::{CacheError, CacheOptions, FeedCache, ManualClock};
use tidings::feed::{Article, FeedFetcher, FetchError, HttpFetcher, TimelineOrder};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory fetcher: fixed articles per URL, unknown URLs return 404.
#[derive(Clone, Default)]
struct StubFetcher {
    feeds: Arc<HashMap<String, Vec<Article>>>,
    calls: Arc<AtomicUsize>,
}

impl StubFetcher {
    fn with_feeds(feeds: &[(&str, Vec<Article>)]) -> Self {
        Self {
            feeds: Arc::new(
                feeds
                    .iter()
                    .map(|(url, articles)| (url.to_string(), articles.clone()))
                    .collect(),
            ),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeedFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Article>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds
            .get(url)
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }
}

fn article(title: &str, published: i64) -> Article {
    Article {
        guid: title.to_string(),
        title: title.to_string(),
        links: vec![format!("https://example.com/{title}")],
        published: Some(Utc.timestamp_opt(published, 0).unwrap()),
        updated: None,
        description: Some(format!("Summary for {title}")),
        content: None,
        authors: Vec::new(),
    }
}

fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn one_hour(capacity: usize) -> CacheOptions {
    CacheOptions {
        capacity,
        ttl: Duration::from_secs(3600),
        ..CacheOptions::default()
    }
}

fn titles(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.title.as_str()).collect()
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_fresh_entry_served_without_fetch() {
    let fetcher = StubFetcher::with_feeds(&[("f", vec![article("a", 1)])]);
    let clock = ManualClock::new(midnight());
    let mut cache = FeedCache::with_clock(fetcher.clone(), one_hour(10), clock.clone());

    let first = cache.get_articles("f", false).await.unwrap();
    clock.advance(TimeDelta::minutes(59));
    let second = cache.get_articles("f", false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_expired_entry_triggers_exactly_one_fetch() {
    let fetcher = StubFetcher::with_feeds(&[("f", vec![article("a", 1)])]);
    let clock = ManualClock::new(midnight());
    let mut cache = FeedCache::with_clock(fetcher.clone(), one_hour(10), clock.clone());

    cache.get_articles("f", false).await.unwrap();
    let before = cache.expires_at("f").unwrap();

    clock.advance(TimeDelta::hours(1));
    cache.get_articles("f", false).await.unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert!(cache.expires_at("f").unwrap() > before);
}

// ============================================================================
// Eviction
// ============================================================================

#[tokio::test]
async fn test_capacity_two_scenario() {
    let fetcher = StubFetcher::with_feeds(&[
        ("url1", vec![article("one", 1)]),
        ("url2", vec![article("two", 2)]),
        ("url3", vec![article("three", 3)]),
    ]);
    let clock = ManualClock::new(midnight());
    let mut cache = FeedCache::with_clock(fetcher, one_hour(2), clock.clone());

    cache.get_articles("url1", false).await.unwrap(); // expires 01:00
    clock.advance(TimeDelta::minutes(10));
    cache.get_articles("url2", false).await.unwrap(); // expires 01:10
    clock.advance(TimeDelta::minutes(10));
    cache.get_articles("url3", false).await.unwrap(); // miss at 00:20

    let mut urls: Vec<&str> = cache.urls().collect();
    urls.sort_unstable();
    assert_eq!(urls, vec!["url2", "url3"]);
}

#[tokio::test]
async fn test_one_past_capacity_evicts_exactly_one() {
    let feeds: Vec<(String, Vec<Article>)> = (0..6)
        .map(|i| (format!("feed{i}"), vec![article(&format!("a{i}"), i)]))
        .collect();
    let refs: Vec<(&str, Vec<Article>)> = feeds
        .iter()
        .map(|(url, articles)| (url.as_str(), articles.clone()))
        .collect();
    let fetcher = StubFetcher::with_feeds(&refs);
    let clock = ManualClock::new(midnight());
    let mut cache = FeedCache::with_clock(fetcher, one_hour(5), clock.clone());

    // Insert out of order so the earliest expiry is not the first URL alphabetically.
    for url in ["feed3", "feed0", "feed4", "feed1", "feed2"] {
        cache.get_articles(url, false).await.unwrap();
        clock.advance(TimeDelta::minutes(1));
    }
    assert_eq!(cache.len(), 5);

    cache.get_articles("feed5", false).await.unwrap();
    assert_eq!(cache.len(), 5);
    assert!(!cache.contains("feed3"));
}

// ============================================================================
// Offline Mode
// ============================================================================

#[tokio::test]
async fn test_offline_never_fetches() {
    let fetcher = StubFetcher::with_feeds(&[("f", vec![article("a", 1)]), ("g", vec![])]);
    let mut cache = FeedCache::new(fetcher.clone(), one_hour(10));

    cache.get_articles("f", false).await.unwrap();
    cache.set_offline(true);

    assert_eq!(titles(&cache.get_articles("f", false).await.unwrap()), vec!["a"]);
    assert!(matches!(
        cache.get_articles("g", false).await,
        Err(CacheError::Offline)
    ));
    assert!(matches!(
        cache.get_articles("f", true).await,
        Err(CacheError::Offline)
    ));
    assert_eq!(fetcher.calls(), 1);

    cache.set_offline(false);
    assert!(cache.get_articles("g", false).await.is_ok());
    assert_eq!(fetcher.calls(), 2);
}

// ============================================================================
// Bulk Timeline
// ============================================================================

const FEED_A: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>A</title>
    <item><guid>a1</guid><title>A one</title><pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate></item>
    <item><guid>a2</guid><title>A two</title><pubDate>Thu, 04 Jan 2024 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

const FEED_C: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>C</title>
    <item><guid>c1</guid><title>C one</title><pubDate>Wed, 03 Jan 2024 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

async fn feed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_A))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_C))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_bulk_with_failing_feed_returns_sorted_union() {
    let server = feed_server().await;
    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|p| format!("{}/{p}", server.uri()))
        .collect();

    let mut cache = FeedCache::new(HttpFetcher::new().unwrap(), CacheOptions::default());
    let timeline = cache.get_articles_bulk(&urls).await;

    assert_eq!(titles(&timeline), vec!["A one", "C one", "A two"]);
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&urls[1]));
}

#[tokio::test]
async fn test_bulk_newest_first_option() {
    let server = feed_server().await;
    let urls = vec![format!("{}/a", server.uri()), format!("{}/c", server.uri())];

    let options = CacheOptions {
        order: TimelineOrder::NewestFirst,
        ..CacheOptions::default()
    };
    let mut cache = FeedCache::new(HttpFetcher::new().unwrap(), options);
    let timeline = cache.get_articles_bulk(&urls).await;

    assert_eq!(titles(&timeline), vec!["A two", "C one", "A one"]);
}

#[tokio::test]
async fn test_timeline_keeps_feed_of_each_article_past_capacity() {
    let mut shared_a = article("from a", 20);
    shared_a.guid = "1".to_string();
    let mut shared_b = article("from b", 10);
    shared_b.guid = "1".to_string();
    let fetcher = StubFetcher::with_feeds(&[("a", vec![shared_a]), ("b", vec![shared_b])]);
    let mut cache = FeedCache::new(fetcher.clone(), one_hour(1));

    let timeline = cache.get_timeline(["a", "b"]).await;

    let sources: Vec<(&str, &str)> = timeline
        .iter()
        .map(|(url, a)| (url.as_str(), a.title.as_str()))
        .collect();
    assert_eq!(sources, vec![("b", "from b"), ("a", "from a")]);
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// Downloads and Persistence
// ============================================================================

#[tokio::test]
async fn test_downloads_survive_restart_after_entries_expire() {
    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("state").join("cache.json");
    let fetcher = StubFetcher::with_feeds(&[("f", vec![article("late", 20), article("early", 10)])]);
    let clock = ManualClock::new(midnight());

    let mut cache = FeedCache::with_clock(fetcher.clone(), one_hour(10), clock.clone());
    cache.add_to_downloaded("f", 0).await.unwrap();
    cache.add_to_downloaded("f", 1).await.unwrap();
    assert!(matches!(
        cache.add_to_downloaded("f", 2).await,
        Err(CacheError::IndexOutOfRange { index: 2, len: 2 })
    ));
    cache.save(&cache_file).unwrap();

    clock.advance(TimeDelta::hours(2));
    let mut restored = FeedCache::with_clock(fetcher, one_hour(10), clock);
    restored.load(&cache_file).unwrap();

    assert!(restored.is_empty(), "expired entries are purged on load");
    assert_eq!(titles(&restored.get_downloaded()), vec!["early", "late"]);

    restored.remove_from_downloaded(0).unwrap();
    assert_eq!(titles(&restored.get_downloaded()), vec!["early"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cache_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("cache.json");
    let mut cache = FeedCache::new(
        StubFetcher::with_feeds(&[("f", vec![article("a", 1)])]),
        CacheOptions::default(),
    );
    cache.get_articles("f", false).await.unwrap();
    cache.save(&cache_file).unwrap();

    let mode = std::fs::metadata(&cache_file).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
