//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, including:
//! - Seeding the frontier from roots and, for recursive runs, the cache
//! - Loading pages from the cache or fetching them
//! - Slotting revisions into their owner's history
//! - Recording failures without aborting the run
//! - Persisting metadata for the next run

use crate::cache::{CrawlMetadata, FailureMap, FetchFailure, PageStore};
use crate::config::{fingerprint_config, Config};
use crate::crawler::discovery::{discover_references, DiscoveryRules};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::CrawlCounters;
use crate::page::{Page, PageIdentity, PageIndex, PageReference};
use crate::{FetchError, MirrorError};
use chrono::Utc;
use serde_json::Value;

/// How often (in processed items) progress is logged
const PROGRESS_INTERVAL: usize = 50;

/// Result of a completed crawl
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Every reference known at the end of the run
    pub index: PageIndex,
    /// Failures still standing, carried-over ones included
    pub failures: FailureMap,
    pub counters: CrawlCounters,
}

/// How a frontier item was resolved
enum Retrieval {
    Cached(Page),
    Fetched(Page),
    /// A previous run's real failure stands and retries are off
    Blocked(FetchFailure),
}

/// Main crawler coordinator structure
pub struct Coordinator<S, F> {
    config: Config,
    store: S,
    fetcher: F,
    rules: DiscoveryRules,
    index: PageIndex,
    failures: FailureMap,
    frontier: Frontier,
    counters: CrawlCounters,
    config_hash: String,
}

impl<S: PageStore, F: PageFetcher> Coordinator<S, F> {
    /// Creates a new coordinator instance
    ///
    /// Loads the previous run's metadata: the alias -> id map seeds the page
    /// index and the failure map carries over.
    ///
    /// # Arguments
    ///
    /// * `config` - The effective configuration
    /// * `store` - Raw payload cache
    /// * `fetcher` - Remote page source
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(MirrorError)` - The metadata document couldn't be read
    pub fn new(config: Config, store: S, fetcher: F) -> Result<Self, MirrorError> {
        let metadata = store.load_metadata()?;
        let config_hash = fingerprint_config(&config);

        match &metadata.config_hash {
            Some(previous) if *previous != config_hash => {
                tracing::info!("Configuration changed since the previous run");
            }
            None => tracing::info!("No previous run metadata found"),
            _ => {}
        }
        tracing::info!(
            "Loaded metadata: {} aliases, {} recorded failures",
            metadata.alias_to_id.len(),
            metadata.failures.len()
        );

        Ok(Self {
            rules: DiscoveryRules::new(&config.discovery),
            index: PageIndex::with_aliases(metadata.alias_to_id),
            failures: metadata.failures,
            frontier: Frontier::new(),
            counters: CrawlCounters::default(),
            config,
            store,
            fetcher,
            config_hash,
        })
    }

    pub fn index(&self) -> &PageIndex {
        &self.index
    }

    pub fn failures(&self) -> &FailureMap {
        &self.failures
    }

    /// Runs the crawl until the frontier is empty
    ///
    /// # Arguments
    ///
    /// * `roots` - Ids or aliases to start from
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The page index, failures and counters
    /// * `Err(MirrorError)` - A fatal error (cache I/O, malformed payload)
    pub async fn run(mut self, roots: &[String]) -> Result<CrawlOutcome, MirrorError> {
        self.counters.started_at = Some(Utc::now());
        self.seed(roots)?;
        tracing::info!(
            "Starting crawl: {} roots, {} items in frontier (recursive: {}, history: {}, cache-only: {})",
            roots.len(),
            self.frontier.len(),
            self.config.crawl.recursive,
            self.config.crawl.history,
            self.config.crawl.cache_only
        );

        while let Some(reference) = self.frontier.pop() {
            self.process(reference).await?;

            if self.counters.processed > 0 && self.counters.processed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} items processed, {} in frontier, {} pages known",
                    self.counters.processed,
                    self.frontier.len(),
                    self.index.page_count()
                );
            }
        }

        self.counters.finished_at = Some(Utc::now());
        self.save()?;
        self.log_failure_report();

        tracing::info!(
            "Crawl completed: {} fetched, {} loaded from cache, {} failed, {} keys visited",
            self.counters.fetched + self.counters.revisions_fetched,
            self.counters.loaded_from_cache + self.counters.revisions_from_cache,
            self.counters.failed,
            self.frontier.visited_count()
        );

        Ok(CrawlOutcome {
            index: self.index,
            failures: self.failures,
            counters: self.counters,
        })
    }

    /// Saves the alias -> id map, failure map and config hash
    pub fn save(&self) -> Result<(), MirrorError> {
        let metadata = CrawlMetadata {
            alias_to_id: self.index.alias_to_id().clone(),
            failures: self.failures.clone(),
            config_hash: Some(self.config_hash.clone()),
            saved_at: Some(Utc::now()),
        };
        self.store.save_metadata(&metadata)?;
        Ok(())
    }

    /// Seeds the frontier
    ///
    /// For recursive runs every cached revision and page goes in first, so
    /// the explicit roots (pushed last) are processed first.
    fn seed(&mut self, roots: &[String]) -> Result<(), MirrorError> {
        if self.config.crawl.recursive {
            let revisions = self.store.list_history()?;
            let pages = self.store.list_current()?;
            tracing::info!(
                "Resuming from cache: {} pages, {} revisions",
                pages.len(),
                revisions.len()
            );

            self.frontier.extend(revisions.iter().map(|(id, edit)| {
                PageReference::KeyOnly(PageIdentity::new(Some(id), None, None, Some(*edit)))
            }));
            self.frontier.extend(
                pages
                    .iter()
                    .map(|id| PageReference::KeyOnly(PageIdentity::new(Some(id), None, None, None))),
            );
        }

        self.frontier.extend(
            roots
                .iter()
                .rev()
                .filter_map(|root| PageReference::from_key(root, None)),
        );
        Ok(())
    }

    /// Resolves one frontier item
    async fn process(&mut self, reference: PageReference) -> Result<(), MirrorError> {
        let edit = reference.requested_edit();
        if self.frontier.is_visited(&reference) {
            return Ok(());
        }

        match edit {
            None => {
                if let Some(page) = self.index.lookup_any(reference.keys()).and_then(PageReference::as_page) {
                    let keys: Vec<String> = page.identity().keys().into_iter().map(str::to_string).collect();
                    self.frontier.mark_visited(keys.iter().map(String::as_str), None);
                    self.frontier.mark_visited(reference.keys(), None);
                    return Ok(());
                }
            }
            Some(edit) => {
                if !self.revision_ready(&reference, edit) {
                    return Ok(());
                }
            }
        }

        self.counters.processed += 1;
        let keys = self.failure_keys(&reference);
        let failure_keys: Vec<&str> = keys.iter().map(String::as_str).collect();

        match self.retrieve(&reference, &failure_keys).await {
            Ok(Retrieval::Blocked(failure)) => {
                tracing::debug!(
                    "Skipping {}: failed on a previous run ({})",
                    reference.identity(),
                    failure.message
                );
                self.counters.skipped += 1;
                self.frontier.mark_visited(reference.keys(), edit);
            }
            Ok(Retrieval::Cached(page)) => {
                self.failures.clear_all(failure_keys.iter().copied(), edit);
                if edit.is_some() {
                    self.counters.revisions_from_cache += 1;
                } else {
                    self.counters.loaded_from_cache += 1;
                }
                self.accept(reference, page);
            }
            Ok(Retrieval::Fetched(page)) => {
                self.failures.clear_all(failure_keys.iter().copied(), edit);
                self.store.persist_raw(page.page_id(), edit, &page.payload)?;
                if edit.is_some() {
                    self.counters.revisions_fetched += 1;
                } else {
                    self.counters.fetched += 1;
                }
                self.accept(reference, page);
            }
            Err(MirrorError::Fetch(error)) => {
                tracing::warn!("Failed to fetch {}: {}", reference.identity(), error);
                let failure = FetchFailure::from(&error);
                if !self.failures.record_merged(&failure_keys, edit, failure) {
                    tracing::debug!(
                        "Keeping earlier failure for {} over cache-only miss",
                        reference.identity()
                    );
                }
                self.counters.failed += 1;
                self.frontier.mark_visited(reference.keys(), edit);
            }
            Err(fatal) => return Err(fatal),
        }

        Ok(())
    }

    /// Checks whether a revision item can be fetched now
    ///
    /// A revision can only be slotted once its owner is a full page. If the
    /// owner is unknown, the item goes back with the owner on top of it; if
    /// the owner already failed, the item is dropped.
    fn revision_ready(&mut self, reference: &PageReference, edit: u32) -> bool {
        let owner = self
            .index
            .lookup_any(reference.keys())
            .and_then(PageReference::as_page);

        match owner {
            Some(owner) => {
                let slot = owner.history.get(edit.saturating_sub(1) as usize);
                if edit == 0 || edit >= owner.edit || slot.is_some_and(PageReference::is_full) {
                    tracing::trace!("Revision {} already resolved or out of range", reference.identity());
                    self.frontier.mark_visited(reference.keys(), Some(edit));
                    return false;
                }
                true
            }
            None => {
                let owner_reference = PageReference::KeyOnly(reference.identity().at_edit(None));
                if self.frontier.is_visited(&owner_reference) {
                    tracing::debug!(
                        "Dropping revision {}: owner page unavailable",
                        reference.identity()
                    );
                    self.frontier.mark_visited(reference.keys(), Some(edit));
                } else {
                    self.frontier.push(reference.clone());
                    self.frontier.push(owner_reference);
                }
                false
            }
        }
    }

    /// Loads from cache, or fetches unless cache-only or blocked
    async fn retrieve(
        &self,
        reference: &PageReference,
        failure_keys: &[&str],
    ) -> Result<Retrieval, MirrorError> {
        let edit = reference.requested_edit();
        let name_max_length = self.config.render.name_max_length;
        let cache_id = self.cache_id(reference);

        if let Some((id, payload)) = self.load_cached(reference, cache_id.as_deref())? {
            tracing::debug!("Loaded {} from cache", reference.identity());
            let page = Page::from_payload(payload, request_key(reference, &id), edit, name_max_length)?;
            return Ok(Retrieval::Cached(page.mark_cached()));
        }

        if self.config.crawl.cache_only {
            return Err(FetchError::CacheOnly {
                key: reference.identity().to_string(),
            }
            .into());
        }

        if !self.config.crawl.retry_failed {
            if let Some(failure) = self.failures.blocking_any(failure_keys.iter().copied(), edit) {
                return Ok(Retrieval::Blocked(failure.clone()));
            }
        }

        let (payload, key) = match edit {
            None => {
                let key = reference.alias_or_id().to_string();
                tracing::info!("Fetching {}", key);
                (self.fetcher.fetch_page(&key).await?, key)
            }
            Some(edit) => {
                let id = cache_id.unwrap_or_else(|| reference.alias_or_id().to_string());
                tracing::info!("Fetching {} edit {}", id, edit);
                (self.fetcher.fetch_edit(&id, edit).await?, id)
            }
        };

        let page = Page::from_payload(payload, &key, edit, name_max_length)?;
        Ok(Retrieval::Fetched(page))
    }

    /// Finds a cached payload under the resolved id, then under each key
    ///
    /// Keys are tried as ids too: a page whose alias equals its id never
    /// enters the alias map.
    fn load_cached(
        &self,
        reference: &PageReference,
        cache_id: Option<&str>,
    ) -> Result<Option<(String, Value)>, MirrorError> {
        let edit = reference.requested_edit();
        let mut candidates: Vec<&str> = cache_id.into_iter().collect();
        for key in reference.keys() {
            if !candidates.contains(&key) {
                candidates.push(key);
            }
        }

        for candidate in candidates {
            if let Some(payload) = self.store.load_raw(candidate, edit)? {
                return Ok(Some((candidate.to_string(), payload)));
            }
        }
        Ok(None)
    }

    /// Registers a resolved page and queues what it references
    fn accept(&mut self, reference: PageReference, page: Page) {
        let edit = reference.requested_edit();
        let discovered = discover_references(&page, &self.rules, self.config.crawl.history);
        tracing::trace!(
            "{}: {} siblings, {} ids, {} revisions",
            page.identity(),
            discovered.siblings.len(),
            discovered.keys.len(),
            discovered.history.len()
        );

        self.frontier.mark_visited(reference.keys(), edit);
        self.frontier.mark_visited(page.identity().keys(), edit);
        self.failures.clear_all(page.identity().keys(), edit);

        for sibling in &discovered.siblings {
            self.index.register(sibling.clone());
        }

        match edit {
            Some(_) => {
                let owner_id = page.page_id().to_string();
                if !self.index.attach_revision(&owner_id, page) {
                    tracing::warn!("No owner page for revision of {}", owner_id);
                }
            }
            None => self.index.register(page.into()),
        }

        if self.config.crawl.recursive {
            self.frontier.extend(discovered.keys);
            self.frontier.extend(discovered.siblings);
        }
        if self.config.crawl.history {
            self.frontier.extend(discovered.history);
        }
    }

    /// Page id used for cache paths, when known
    fn cache_id(&self, reference: &PageReference) -> Option<String> {
        reference
            .page_id()
            .map(ToString::to_string)
            .or_else(|| reference.keys().into_iter().find_map(|key| self.index.resolve_id(key)))
    }

    /// Keys a failure of `reference` may be recorded under
    ///
    /// The first is where new failures go: the page id when known, else
    /// the alias. The rest are the reference's other keys, which may hold
    /// entries from runs that had not yet resolved the id.
    fn failure_keys(&self, reference: &PageReference) -> Vec<String> {
        let mut keys = vec![self
            .cache_id(reference)
            .unwrap_or_else(|| reference.alias_or_id().to_string())];
        for key in reference.keys() {
            if !keys.iter().any(|known| known == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }

    fn log_failure_report(&self) {
        if self.failures.is_empty() {
            tracing::info!("No fetch failures");
            return;
        }

        tracing::warn!(
            "{} fetch failures across {} pages:",
            self.failures.len(),
            self.failures.identity_count()
        );
        for (identity, edit, failure) in self.failures.iter() {
            match edit {
                Some(edit) => tracing::warn!("  {} edit {}: {}", identity, edit, failure.message),
                None => tracing::warn!("  {}: {}", identity, failure.message),
            }
        }
    }
}

/// Key used to locate the primary page inside a payload
fn request_key<'a>(reference: &'a PageReference, cache_id: &'a str) -> &'a str {
    match reference.identity().alias.as_deref() {
        Some(alias) => alias,
        None => cache_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FailureKind, FsStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Serves canned payloads and counts calls
    #[derive(Clone, Default)]
    struct FakeFetcher {
        pages: Arc<Mutex<HashMap<String, Value>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeFetcher {
        fn with_page(self, key: &str, payload: Value) -> Self {
            self.pages.lock().unwrap().insert(key.to_string(), payload);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_page(&self, key: &str) -> Result<Value, MirrorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| {
                    FetchError::HttpStatus {
                        url: format!("fake://{}", key),
                        status: 404,
                    }
                    .into()
                })
        }

        async fn fetch_edit(&self, page_id: &str, edit: u32) -> Result<Value, MirrorError> {
            self.fetch_page(&format!("{}@{}", page_id, edit)).await
        }
    }

    fn payload(id: &str, alias: &str, edit: u32, links: &[&str]) -> Value {
        json!({
            "result": {"primaryPageId": id},
            "pages": {id: {
                "pageId": id,
                "alias": alias,
                "title": format!("Title {}", id),
                "text": format!("Text of {}", id),
                "type": "wiki",
                "edit": edit,
                "childIds": links,
            }}
        })
    }

    fn config(recursive: bool, history: bool) -> Config {
        let mut config = Config::default();
        config.crawl.recursive = recursive;
        config.crawl.history = history;
        config
    }

    fn roots(keys: &[&str]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_single_page_crawl() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default().with_page("a", payload("1", "a", 1, &["2"]));

        let coordinator =
            Coordinator::new(config(false, false), FsStore::new(dir.path()), fetcher.clone()).unwrap();
        let outcome = coordinator.run(&roots(&["a"])).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(outcome.index.page_count(), 1);
        assert_eq!(outcome.counters.fetched, 1);
        assert!(FsStore::new(dir.path()).contains("1", None));
    }

    #[tokio::test]
    async fn test_cyclic_graph_terminates() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .with_page("a", payload("a", "a", 1, &["b"]))
            .with_page("b", payload("b", "b", 1, &["c"]))
            .with_page("c", payload("c", "c", 1, &["a", "b"]));

        let coordinator =
            Coordinator::new(config(true, false), FsStore::new(dir.path()), fetcher.clone()).unwrap();
        let outcome = coordinator.run(&roots(&["a"])).await.unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(outcome.index.page_count(), 3);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_uses_cache_only() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .with_page("a", payload("a", "a", 1, &["b"]))
            .with_page("b", payload("b", "b", 1, &[]));

        let first = Coordinator::new(config(true, false), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["a"]))
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);

        let second = Coordinator::new(config(true, false), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["a"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(second.counters.loaded_from_cache, 2);
        assert_eq!(first.index.snapshot(), second.index.snapshot());
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_crawl_continues() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default().with_page("a", payload("a", "a", 1, &["missing", "b"]))
            .with_page("b", payload("b", "b", 1, &[]));

        let outcome = Coordinator::new(config(true, false), FsStore::new(dir.path()), fetcher)
            .unwrap()
            .run(&roots(&["a"]))
            .await
            .unwrap();

        assert_eq!(outcome.index.page_count(), 2);
        let failure = outcome.failures.get("missing", None).unwrap();
        assert_eq!(failure.kind, FailureKind::HttpStatus);
        assert_eq!(failure.status, Some(404));

        let saved = FsStore::new(dir.path()).load_metadata().unwrap();
        assert_eq!(saved.failures, outcome.failures);
    }

    #[tokio::test]
    async fn test_cache_only_keeps_real_failures() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["gone"]))
            .await
            .unwrap();

        let mut offline = config(false, false);
        offline.crawl.cache_only = true;
        let fetcher = FakeFetcher::default();
        let outcome = Coordinator::new(offline, FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["gone", "never_seen"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 0);
        assert_eq!(outcome.failures.get("gone", None).unwrap().kind, FailureKind::HttpStatus);
        assert_eq!(
            outcome.failures.get("never_seen", None).unwrap().kind,
            FailureKind::CacheOnly
        );
    }

    #[tokio::test]
    async fn test_previous_failure_blocks_without_retry() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["gone"]))
            .await
            .unwrap();

        let mut no_retry = config(false, false);
        no_retry.crawl.retry_failed = false;
        let fetcher = FakeFetcher::default();
        let outcome = Coordinator::new(no_retry, FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["gone"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 0);
        assert_eq!(outcome.counters.skipped, 1);
        assert!(outcome.failures.get("gone", None).is_some());
    }

    #[tokio::test]
    async fn test_success_clears_previous_failure() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["flaky"]))
            .await
            .unwrap();

        let fetcher = FakeFetcher::default().with_page("flaky", payload("flaky", "flaky", 1, &[]));
        let outcome = Coordinator::new(config(false, false), FsStore::new(dir.path()), fetcher)
            .unwrap()
            .run(&roots(&["flaky"]))
            .await
            .unwrap();

        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_history_revisions_are_slotted() {
        let dir = TempDir::new().unwrap();
        let fetcher = FakeFetcher::default()
            .with_page("a", payload("a", "a", 3, &[]))
            .with_page("a@1", payload("a", "a", 1, &[]))
            .with_page("a@2", payload("a", "a", 2, &[]));

        let outcome = Coordinator::new(config(false, true), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["a"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(outcome.counters.revisions_fetched, 2);
        let page = outcome.index.get_page("a").unwrap();
        assert!(page.history.iter().all(PageReference::is_full));
        assert!(FsStore::new(dir.path()).contains("a", Some(2)));
    }

    #[tokio::test]
    async fn test_revision_waits_for_owner() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        store.persist_raw("a", Some(1), &payload("a", "a", 1, &[])).unwrap();

        // Only the revision is cached, so it pops before its owner is known
        let fetcher = FakeFetcher::default().with_page("a", payload("a", "a", 2, &[]));
        let outcome = Coordinator::new(config(true, true), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&[])
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(outcome.counters.revisions_from_cache, 1);
        assert!(outcome.index.get_page("a").unwrap().history[0].is_full());
    }

    #[tokio::test]
    async fn test_revision_dropped_when_owner_fails() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        store.persist_raw("a", Some(1), &payload("a", "a", 1, &[])).unwrap();

        let fetcher = FakeFetcher::default();
        let outcome = Coordinator::new(config(true, true), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&[])
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(outcome.index.page_count(), 0);
        assert!(outcome.failures.get("a", None).is_some());
        assert!(outcome.failures.get("a", Some(1)).is_none());
    }

    #[tokio::test]
    async fn test_non_recursive_registers_siblings() {
        let dir = TempDir::new().unwrap();
        let mut with_sibling = payload("a", "a", 1, &["b"]);
        with_sibling["pages"]["b"] = json!({"pageId": "b", "alias": "b_alias", "title": "B"});
        let fetcher = FakeFetcher::default().with_page("a", with_sibling);

        let outcome = Coordinator::new(config(false, false), FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["a"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(outcome.index.get("b_alias").unwrap().title(), Some("B"));
    }

    /// Payload for `a` that embeds page 9 (alias `foo`) as a sibling
    fn payload_naming_foo() -> Value {
        let mut with_sibling = payload("a", "a", 1, &[]);
        with_sibling["pages"]["9"] = json!({"pageId": "9", "alias": "foo", "title": "Foo"});
        with_sibling
    }

    #[tokio::test]
    async fn test_success_clears_failure_recorded_under_alias() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["foo"]))
            .await
            .unwrap();
        assert!(FsStore::new(dir.path())
            .load_metadata()
            .unwrap()
            .failures
            .get("foo", None)
            .is_some());

        // `a` resolves foo -> 9 before foo itself is fetched
        let fetcher = FakeFetcher::default()
            .with_page("a", payload_naming_foo())
            .with_page("foo", payload("9", "foo", 1, &[]));
        let outcome = Coordinator::new(config(false, false), FsStore::new(dir.path()), fetcher)
            .unwrap()
            .run(&roots(&["a", "foo"]))
            .await
            .unwrap();

        assert!(outcome.index.get_page("foo").is_some());
        assert!(outcome.failures.is_empty(), "stale failures: {:?}", outcome.failures);
        let saved = FsStore::new(dir.path()).load_metadata().unwrap();
        assert!(saved.failures.is_empty());
    }

    #[tokio::test]
    async fn test_alias_failure_blocks_once_id_is_known() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["foo"]))
            .await
            .unwrap();

        let mut no_retry = config(false, false);
        no_retry.crawl.retry_failed = false;
        let fetcher = FakeFetcher::default()
            .with_page("a", payload_naming_foo())
            .with_page("foo", payload("9", "foo", 1, &[]));
        let outcome = Coordinator::new(no_retry, FsStore::new(dir.path()), fetcher.clone())
            .unwrap()
            .run(&roots(&["a", "foo"]))
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(outcome.counters.skipped, 1);
        assert_eq!(outcome.failures.identity_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_failure_folds_alias_entry_into_id() {
        let dir = TempDir::new().unwrap();
        Coordinator::new(config(false, false), FsStore::new(dir.path()), FakeFetcher::default())
            .unwrap()
            .run(&roots(&["foo"]))
            .await
            .unwrap();

        let fetcher = FakeFetcher::default().with_page("a", payload_naming_foo());
        let outcome = Coordinator::new(config(false, false), FsStore::new(dir.path()), fetcher)
            .unwrap()
            .run(&roots(&["a", "foo"]))
            .await
            .unwrap();

        assert!(outcome.failures.get("foo", None).is_none());
        assert_eq!(outcome.failures.get("9", None).map(|f| f.kind), Some(FailureKind::HttpStatus));
        assert_eq!(outcome.failures.identity_count(), 1);
    }
}
