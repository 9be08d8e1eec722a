//! Raw payload cache
//!
//! This module handles everything the crawl keeps on disk between runs:
//! - Raw JSON payloads of current pages and historical revisions
//! - The metadata document (alias -> id map, failure map, config hash)
//!
//! Re-running a crawl against a fully populated cache needs no network access.

mod fs;
mod metadata;
mod traits;

pub use fs::{decode_key, encode_key, CacheLayout, FsStore};
pub use metadata::{CrawlMetadata, FailureKind, FailureMap, FetchFailure, PageFailures};
pub use traits::{CacheError, CacheResult, PageStore};

use std::path::Path;

/// Opens the filesystem cache rooted at `path`
///
/// # Arguments
///
/// * `path` - Cache directory (created on first write)
pub fn open_store(path: &Path) -> FsStore {
    FsStore::new(path)
}
