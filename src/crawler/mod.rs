//! Crawler module for page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - Fetching page payloads from the source site's JSON API
//! - The LIFO frontier and its visited set
//! - Reference discovery in fetched payloads
//! - Overall crawl coordination

mod coordinator;
mod discovery;
mod fetcher;
mod frontier;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use discovery::{discover_references, Discovered, DiscoveryRules};
pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use frontier::Frontier;

use crate::cache::open_store;
use crate::config::Config;
use crate::MirrorError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Counters collected during one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlCounters {
    /// Frontier items that needed resolving
    pub processed: usize,
    /// Current pages fetched over the network
    pub fetched: usize,
    /// Current pages loaded from the cache
    pub loaded_from_cache: usize,
    pub revisions_fetched: usize,
    pub revisions_from_cache: usize,
    /// Fetch attempts that failed this run
    pub failed: usize,
    /// Items skipped because an earlier run's failure stands
    pub skipped: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlCounters {
    /// Wall-clock duration of the run, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the cache and load the previous run's metadata
/// 2. Build the HTTP fetcher
/// 3. Crawl from `roots` (and the cache, for recursive runs)
/// 4. Save the metadata for the next run
///
/// # Arguments
///
/// * `config` - The effective configuration
/// * `roots` - Ids or aliases to start from
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl completed
/// * `Err(MirrorError)` - Crawl aborted on a fatal error
pub async fn crawl(config: Config, roots: &[String]) -> Result<CrawlOutcome, MirrorError> {
    let store = open_store(Path::new(&config.cache.directory));
    let fetcher = HttpFetcher::new(&config.source)?;
    Coordinator::new(config, store, fetcher)?.run(roots).await
}
