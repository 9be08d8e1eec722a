//! Cache traits and error types
//!
//! This module defines the trait interface for raw payload stores and
//! associated error types.

use crate::cache::CrawlMetadata;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for raw payload store implementations
///
/// Current pages and historical revisions live in separate namespaces, so a
/// page id and an `(id, edit)` pair never address the same entry. `edit` is
/// `None` for the current edit.
pub trait PageStore {
    // ===== Raw Payloads =====

    /// Checks whether a payload is cached
    fn contains(&self, page_id: &str, edit: Option<u32>) -> bool;

    /// Loads a cached payload
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - The cached payload
    /// * `Ok(None)` - Nothing cached for this page and edit
    /// * `Err(CacheError)` - The entry exists but couldn't be read
    fn load_raw(&self, page_id: &str, edit: Option<u32>) -> CacheResult<Option<Value>>;

    /// Writes a payload
    ///
    /// Writing the same payload twice produces identical bytes.
    fn persist_raw(&self, page_id: &str, edit: Option<u32>, payload: &Value) -> CacheResult<()>;

    /// Ids of every cached current page, sorted
    fn list_current(&self) -> CacheResult<Vec<String>>;

    /// `(id, edit)` of every cached revision, sorted
    fn list_history(&self) -> CacheResult<Vec<(String, u32)>>;

    // ===== Metadata =====

    /// Loads the metadata document, empty when none was saved yet
    fn load_metadata(&self) -> CacheResult<CrawlMetadata>;

    /// Saves the metadata document
    fn save_metadata(&self, metadata: &CrawlMetadata) -> CacheResult<()>;
}
