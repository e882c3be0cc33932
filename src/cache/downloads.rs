use serde::{Deserialize, Serialize};

use super::CacheError;
use crate::feed::{sort_by_published, Article, TimelineOrder};

/// Articles the user chose to keep beyond the cache's expiry window.
///
/// Only grows by [`push`](Self::push) and shrinks by
/// [`remove`](Self::remove), so positions are always `0..len` with no gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadStore {
    articles: Vec<Article>,
}

impl DownloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy of an article; it takes the next index.
    pub fn push(&mut self, article: Article) {
        self.articles.push(article);
    }

    /// Remove the article at `index` (insertion order), shifting later ones down.
    pub fn remove(&mut self, index: usize) -> Result<Article, CacheError> {
        if index >= self.articles.len() {
            return Err(CacheError::IndexOutOfRange {
                index,
                len: self.articles.len(),
            });
        }
        Ok(self.articles.remove(index))
    }

    /// Article at `index` in insertion order.
    pub fn get(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    /// Number of saved articles.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Articles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }

    /// Copy of the list sorted by publication date.
    pub fn sorted(&self, order: TimelineOrder) -> Vec<Article> {
        let mut articles = self.articles.clone();
        sort_by_published(&mut articles, order);
        articles
    }
}

impl From<Vec<Article>> for DownloadStore {
    fn from(articles: Vec<Article>) -> Self {
        Self { articles }
    }
}
