//! # tidings
//!
//! The content cache and read-state core of a terminal feed reader.
//!
//! ```text
//! FeedFetcher → FeedCache → timeline / downloads
//!                    ↘ cache.json        ReadStatusSet → read_status.bin
//! ```
//!
//! - [`feed`]: article type, RSS/Atom parsing, the [`feed::FeedFetcher`] trait
//!   and its HTTP implementation
//! - [`cache`]: per-feed cache with expiry, eviction, bulk timelines and the
//!   downloads list, plus its JSON persistence
//! - [`storage`]: read-status set and owner-only file handling
//! - [`service`]: single-owner task for sharing a cache between async tasks
//! - [`config`]: `config.toml` loading

pub mod cache;
pub mod config;
pub mod feed;
pub mod service;
pub mod storage;
pub mod util;
