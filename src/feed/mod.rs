//! Feed retrieval: the article value type, RSS/Atom parsing, and the
//! [`FeedFetcher`] capability the cache consumes.
//!
//! - `article` - The [`Article`] value and timeline ordering
//! - `parser` - feed-rs based parsing into articles
//! - `fetcher` - The [`FeedFetcher`] trait and its reqwest implementation

mod article;
mod fetcher;
mod parser;

pub use article::{sort_by_published, sort_by_published_with, Article, TimelineOrder};
pub use fetcher::{FeedFetcher, FetchError, HttpFetcher, USER_AGENT};
pub use parser::parse_feed;
