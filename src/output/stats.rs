//! Statistics generation from the payload cache
//!
//! This module provides functionality for extracting and displaying
//! statistics about what previous crawl runs left on disk.

use crate::cache::{FailureKind, PageStore};
use crate::MirrorError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Cache statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Current pages with a cached payload
    pub cached_pages: usize,

    /// Historical revisions with a cached payload
    pub cached_revisions: usize,

    /// Pages with at least one cached revision
    pub pages_with_history: usize,

    /// Entries in the alias -> id map
    pub aliases: usize,

    /// Recorded failures by kind
    pub failures_by_kind: BTreeMap<FailureKind, usize>,

    /// Pages with at least one recorded failure
    pub failed_pages: usize,

    /// Hash of the configuration used by the last run
    pub config_hash: Option<String>,

    /// When the last run saved its metadata
    pub saved_at: Option<DateTime<Utc>>,
}

impl CrawlStatistics {
    /// Total recorded failures
    pub fn total_failures(&self) -> usize {
        self.failures_by_kind.values().sum()
    }
}

/// Loads statistics from the cache
///
/// # Arguments
///
/// * `store` - The payload store to inspect
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to list entries or read the metadata
pub fn load_statistics(store: &dyn PageStore) -> Result<CrawlStatistics, MirrorError> {
    let cached_pages = store.list_current()?.len();

    let history = store.list_history()?;
    let mut pages_with_history: Vec<&str> = history.iter().map(|(id, _)| id.as_str()).collect();
    pages_with_history.dedup();

    let metadata = store.load_metadata()?;
    let mut failures_by_kind = BTreeMap::new();
    for (_, _, failure) in metadata.failures.iter() {
        *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
    }

    Ok(CrawlStatistics {
        cached_pages,
        cached_revisions: history.len(),
        pages_with_history: pages_with_history.len(),
        aliases: metadata.alias_to_id.len(),
        failures_by_kind,
        failed_pages: metadata.failures.identity_count(),
        config_hash: metadata.config_hash,
        saved_at: metadata.saved_at,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Cache Statistics ===\n");

    println!("Overview:");
    println!("  Cached pages: {}", stats.cached_pages);
    println!(
        "  Cached revisions: {} (across {} pages)",
        stats.cached_revisions, stats.pages_with_history
    );
    println!("  Known aliases: {}", stats.aliases);
    println!();

    if stats.failures_by_kind.is_empty() {
        println!("No recorded failures");
    } else {
        println!(
            "Failures ({} across {} pages):",
            stats.total_failures(),
            stats.failed_pages
        );
        let mut kinds: Vec<_> = stats.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
    }
    println!();

    match (&stats.saved_at, &stats.config_hash) {
        (Some(saved_at), Some(hash)) => {
            println!("Last run: {} (config {})", saved_at.to_rfc3339(), hash)
        }
        (Some(saved_at), None) => println!("Last run: {}", saved_at.to_rfc3339()),
        _ => println!("No completed run recorded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CrawlMetadata, FetchFailure, FsStore};
    use serde_json::json;
    use tempfile::TempDir;

    fn failure(kind: FailureKind) -> FetchFailure {
        FetchFailure {
            kind,
            message: format!("{} failure", kind),
            status: None,
        }
    }

    #[test]
    fn test_empty_cache() {
        let dir = TempDir::new().unwrap();
        let stats = load_statistics(&FsStore::new(dir.path())).unwrap();
        assert_eq!(stats, CrawlStatistics::default());
    }

    #[test]
    fn test_load_statistics() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let payload = json!({"pages": {}});
        store.persist_raw("1", None, &payload).unwrap();
        store.persist_raw("2", None, &payload).unwrap();
        store.persist_raw("1", Some(1), &payload).unwrap();
        store.persist_raw("1", Some(2), &payload).unwrap();

        let mut metadata = CrawlMetadata::default();
        metadata.alias_to_id.insert("one".to_string(), "1".to_string());
        metadata.failures.record("3", None, failure(FailureKind::Timeout));
        metadata.failures.record("3", Some(1), failure(FailureKind::Timeout));
        metadata.failures.record("4", None, failure(FailureKind::CacheOnly));
        metadata.config_hash = Some("abc".to_string());
        store.save_metadata(&metadata).unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.cached_pages, 2);
        assert_eq!(stats.cached_revisions, 2);
        assert_eq!(stats.pages_with_history, 1);
        assert_eq!(stats.aliases, 1);
        assert_eq!(stats.failed_pages, 2);
        assert_eq!(stats.total_failures(), 3);
        assert_eq!(stats.failures_by_kind.get(&FailureKind::Timeout), Some(&2));
        assert_eq!(stats.config_hash.as_deref(), Some("abc"));
    }
}
