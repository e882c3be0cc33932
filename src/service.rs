//! Single-owner task around a [`FeedCache`].
//!
//! The cache's invariants (evict-then-insert, failed refresh leaves state
//! alone) rely on every operation being a whole-structure transition. Rather
//! than locking pieces of it, [`CacheService::spawn`] moves the cache into one
//! tokio task and hands out [`CacheHandle`]s that talk to it over a channel.
//! Requests are served strictly in arrival order.
//!
//! The task ends once every handle has been dropped, and its `JoinHandle`
//! yields the cache back so it can be saved.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::cache::{CacheError, Clock, FeedCache};
use crate::feed::{Article, FeedFetcher};

const COMMAND_BUFFER: usize = 32;

enum Command {
    GetArticles {
        url: String,
        force_refresh: bool,
        reply: oneshot::Sender<Result<Vec<Article>, CacheError>>,
    },
    GetArticlesBulk {
        urls: Vec<String>,
        reply: oneshot::Sender<Vec<Article>>,
    },
    AddToDownloaded {
        url: String,
        index: usize,
        reply: oneshot::Sender<Result<(), CacheError>>,
    },
    RemoveFromDownloaded {
        index: usize,
        reply: oneshot::Sender<Result<Article, CacheError>>,
    },
    GetDownloaded {
        reply: oneshot::Sender<Vec<Article>>,
    },
    SetOffline {
        offline: bool,
    },
}

pub struct CacheService;

impl CacheService {
    /// Move `cache` into a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, C>(cache: FeedCache<F, C>) -> (CacheHandle, JoinHandle<FeedCache<F, C>>)
    where
        F: FeedFetcher + Send + Sync + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(cache, rx));
        (CacheHandle { tx }, task)
    }
}

async fn run<F, C>(mut cache: FeedCache<F, C>, mut rx: mpsc::Receiver<Command>) -> FeedCache<F, C>
where
    F: FeedFetcher + Send + Sync,
    C: Clock + Send + Sync,
{
    tracing::debug!("Cache service started");

    while let Some(command) = rx.recv().await {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::GetArticles {
                url,
                force_refresh,
                reply,
            } => {
                let _ = reply.send(cache.get_articles(&url, force_refresh).await);
            }
            Command::GetArticlesBulk { urls, reply } => {
                let _ = reply.send(cache.get_articles_bulk(urls).await);
            }
            Command::AddToDownloaded { url, index, reply } => {
                let _ = reply.send(cache.add_to_downloaded(&url, index).await);
            }
            Command::RemoveFromDownloaded { index, reply } => {
                let _ = reply.send(cache.remove_from_downloaded(index));
            }
            Command::GetDownloaded { reply } => {
                let _ = reply.send(cache.get_downloaded());
            }
            Command::SetOffline { offline } => cache.set_offline(offline),
        }
    }

    tracing::debug!(entries = cache.len(), "Cache service stopped");
    cache
}

/// Cloneable handle to a running [`CacheService`].
#[derive(Clone)]
pub struct CacheHandle {
    tx: mpsc::Sender<Command>,
}

impl CacheHandle {
    pub async fn get_articles(
        &self,
        url: &str,
        force_refresh: bool,
    ) -> Result<Vec<Article>, CacheError> {
        self.request(|reply| Command::GetArticles {
            url: url.to_string(),
            force_refresh,
            reply,
        })
        .await?
    }

    pub async fn get_articles_bulk(&self, urls: Vec<String>) -> Result<Vec<Article>, CacheError> {
        self.request(|reply| Command::GetArticlesBulk { urls, reply })
            .await
    }

    pub async fn add_to_downloaded(&self, url: &str, index: usize) -> Result<(), CacheError> {
        self.request(|reply| Command::AddToDownloaded {
            url: url.to_string(),
            index,
            reply,
        })
        .await?
    }

    pub async fn remove_from_downloaded(&self, index: usize) -> Result<Article, CacheError> {
        self.request(|reply| Command::RemoveFromDownloaded { index, reply })
            .await?
    }

    pub async fn get_downloaded(&self) -> Result<Vec<Article>, CacheError> {
        self.request(|reply| Command::GetDownloaded { reply }).await
    }

    pub async fn set_offline(&self, offline: bool) -> Result<(), CacheError> {
        self.tx
            .send(Command::SetOffline { offline })
            .await
            .map_err(|_| CacheError::ServiceStopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CacheError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CacheError::ServiceStopped)?;
        rx.await.map_err(|_| CacheError::ServiceStopped)
    }
}
