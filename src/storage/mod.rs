//! On-disk state: owner-only file writes, the read-status set, and default
//! locations under the user's cache directory.

mod error;
mod fs;
mod read_status;

use std::path::PathBuf;

pub use error::{PersistError, ReadStatusError};
pub use fs::write_private;
pub(crate) use fs::read_optional;
pub use read_status::{read_status_hash, ReadStatusSet};

const APP_DIR: &str = "tidings";
const CACHE_FILE: &str = "cache.json";
const READ_STATUS_FILE: &str = "read_status.bin";

/// `<user cache dir>/tidings`, or `None` when the platform has no cache dir.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs_next::cache_dir().map(|dir| dir.join(APP_DIR))
}

pub fn default_cache_path() -> Option<PathBuf> {
    default_data_dir().map(|dir| dir.join(CACHE_FILE))
}

pub fn default_read_status_path() -> Option<PathBuf> {
    default_data_dir().map(|dir| dir.join(READ_STATUS_FILE))
}
