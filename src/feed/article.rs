use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single feed item as held by the cache.
///
/// Articles are plain values: the cache hands out copies and the download
/// list stores its own copies, so nothing here is shared or reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Feed-provided id, or a SHA-256 of link/title/published when absent.
    pub guid: String,
    pub title: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

impl Article {
    /// First link of the article, usually the permalink.
    pub fn link(&self) -> Option<&str> {
        self.links.first().map(String::as_str)
    }

    /// Content body if present, otherwise the description.
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().or(self.description.as_deref())
    }
}

/// Order in which aggregated timelines and the download list are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineOrder {
    /// Ascending by publication date. Articles without a date come first.
    #[default]
    OldestFirst,
    /// Descending by publication date. Articles without a date come last.
    NewestFirst,
}

/// Stable sort by publication date.
///
/// Articles sharing a date (or both lacking one) keep their relative order,
/// so the result is a total order that only depends on the input sequence.
pub fn sort_by_published(articles: &mut [Article], order: TimelineOrder) {
    sort_by_published_with(articles, order, |article| article);
}

/// [`sort_by_published`] for items that carry an article, such as
/// `(feed_url, Article)` pairs.
pub fn sort_by_published_with<T>(
    items: &mut [T],
    order: TimelineOrder,
    article: impl Fn(&T) -> &Article,
) {
    match order {
        TimelineOrder::OldestFirst => {
            items.sort_by(|a, b| article(a).published.cmp(&article(b).published))
        }
        TimelineOrder::NewestFirst => {
            items.sort_by(|a, b| article(b).published.cmp(&article(a).published))
        }
    }
}
