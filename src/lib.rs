//! wiki-mirror: an offline mirror for a remote wiki-like knowledge base
//!
//! This crate fetches JSON page payloads, follows the page references embedded
//! in them, caches every raw payload on disk and renders a cross-linked static
//! HTML site (pages, metadata views, revision diffs and category indexes).

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod page;
pub mod render;

use thiserror::Error;

/// Main error type for wiki-mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed payload: {0}")]
    DataShape(String),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Returns true if the crawl should record this error and carry on
    ///
    /// Only fetch failures are recoverable; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Errors raised while fetching a single page from the remote source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network access disabled (cache-only mode), cannot fetch {key}")]
    CacheOnly { key: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOutcome};
pub use page::{Page, PageIndex, PageReference, ReferenceStatus};
pub use render::{PageDiff, RenderedText, TextRenderer};
