//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the source site's JSON API and
//! run the full crawl cycle end-to-end against a scratch cache directory.

use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use wiki_mirror::cache::{FailureKind, FsStore, PageStore};
use wiki_mirror::config::Config;
use wiki_mirror::crawler::crawl;
use wiki_mirror::output::write_site;
use wiki_mirror::{MirrorError, TextRenderer};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, cache: &TempDir, site: &TempDir) -> Config {
    let mut config = Config::default();
    config.source.base_url = base_url.to_string();
    config.source.timeout_ms = 2_000;
    config.cache.directory = cache.path().display().to_string();
    config.output.directory = site.path().display().to_string();
    config
}

fn page_payload(id: &str, alias: &str, title: &str, text: &str, extra: Value) -> Value {
    let mut page = json!({
        "pageId": id,
        "alias": alias,
        "title": title,
        "text": text,
        "type": "wiki",
        "edit": 1
    });
    if let (Some(page), Some(extra)) = (page.as_object_mut(), extra.as_object()) {
        page.extend(extra.clone());
    }
    json!({ "pages": { id: page } })
}

async fn mount_page(server: &MockServer, key: &str, payload: Value, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/json/primaryPage/"))
        .and(body_partial_json(json!({ "pageAlias": key })))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .expect(expected)
        .mount(server)
        .await;
}

fn roots(keys: &[&str]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_recursive_crawl_follows_references() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "bayes",
        page_payload("1", "bayes", "Bayes' rule", "See [odds].", json!({"childIds": ["2"]})),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "2",
        page_payload("2", "odds", "Odds", "Ratios.", json!({"parentIds": ["1"]})),
        1,
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.crawl.recursive = true;

    let outcome = crawl(config, &roots(&["bayes"])).await.unwrap();

    assert_eq!(outcome.index.page_count(), 2);
    assert_eq!(outcome.counters.fetched, 2);
    assert!(outcome.failures.is_empty());
    assert!(outcome.index.get_page("odds").is_some());

    let store = FsStore::new(cache.path());
    assert_eq!(store.list_current().unwrap(), vec!["1", "2"]);
    let metadata = store.load_metadata().unwrap();
    assert_eq!(metadata.alias_to_id.get("bayes").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_rerun_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    // One request each across both runs
    mount_page(
        &mock_server,
        "bayes",
        page_payload("1", "bayes", "Bayes' rule", "", json!({"childIds": ["2"]})),
        1,
    )
    .await;
    mount_page(&mock_server, "2", page_payload("2", "odds", "Odds", "", json!({})), 1).await;

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.crawl.recursive = true;

    let first = crawl(config.clone(), &roots(&["bayes"])).await.unwrap();
    assert_eq!(first.counters.fetched, 2);

    let second = crawl(config, &roots(&["bayes"])).await.unwrap();
    assert_eq!(second.counters.fetched, 0);
    assert_eq!(second.counters.loaded_from_cache, 2);
    assert_eq!(second.index.page_count(), 2);
    assert!(second.index.get_page("bayes").is_some_and(|page| page.cached));
}

#[tokio::test]
async fn test_failed_fetch_is_recorded() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(&mock_server, "bayes", page_payload("1", "bayes", "Bayes' rule", "", json!({})), 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/json/primaryPage/"))
        .and(body_partial_json(json!({ "pageAlias": "gone" })))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &cache, &site);
    let outcome = crawl(config, &roots(&["bayes", "gone"])).await.unwrap();

    assert_eq!(outcome.index.page_count(), 1);
    let failure = outcome.failures.get("gone", None).unwrap();
    assert_eq!(failure.kind, FailureKind::HttpStatus);
    assert_eq!(failure.status, Some(404));

    let saved = FsStore::new(cache.path()).load_metadata().unwrap();
    assert!(saved.failures.get("gone", None).is_some());
}

#[tokio::test]
async fn test_history_revisions_are_fetched() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "bayes",
        page_payload("1", "bayes", "Bayes' rule", "Third draft", json!({"edit": 3})),
        1,
    )
    .await;
    for (edit, text) in [(1, "First draft"), (2, "Second draft")] {
        Mock::given(method("POST"))
            .and(path("/json/edit/"))
            .and(body_partial_json(json!({ "pageAlias": "1", "specificEdit": edit })))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_payload(
                "1",
                "bayes",
                "Bayes' rule",
                text,
                json!({"edit": edit}),
            )))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.crawl.history = true;

    let outcome = crawl(config, &roots(&["bayes"])).await.unwrap();
    assert_eq!(outcome.counters.revisions_fetched, 2);

    let page = outcome.index.get_page("bayes").unwrap();
    assert_eq!(page.history.len(), 2);
    assert!(page.history.iter().all(|slot| slot.is_full()));
    assert_eq!(page.history[0].as_page().unwrap().text, "First draft");

    let diff = page.diff(&page.history, 4);
    assert_eq!(diff.base_edit, Some(2));
    assert!(diff.html.contains("<ins>Third</ins>"));

    let store = FsStore::new(cache.path());
    assert_eq!(
        store.list_history().unwrap(),
        vec![("1".to_string(), 1), ("1".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_cache_only_never_touches_network() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.crawl.cache_only = true;

    let outcome = crawl(config, &roots(&["bayes"])).await.unwrap();
    assert_eq!(outcome.index.page_count(), 0);
    assert_eq!(
        outcome.failures.get("bayes", None).map(|f| f.kind),
        Some(FailureKind::CacheOnly)
    );
}

#[tokio::test]
async fn test_slow_response_is_recorded_as_timeout() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(&mock_server, "bayes", page_payload("1", "bayes", "Bayes' rule", "", json!({})), 1)
        .await;
    Mock::given(method("POST"))
        .and(path("/json/primaryPage/"))
        .and(body_partial_json(json!({ "pageAlias": "slow" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_payload("2", "slow", "Slow", "", json!({})))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.source.timeout_ms = 200;

    let outcome = crawl(config, &roots(&["bayes", "slow"])).await.unwrap();

    assert_eq!(outcome.index.page_count(), 1);
    assert_eq!(outcome.counters.failed, 1);
    assert_eq!(
        outcome.failures.get("slow", None).map(|f| f.kind),
        Some(FailureKind::Timeout)
    );
}

#[tokio::test]
async fn test_non_json_response_aborts_crawl() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/json/primaryPage/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &cache, &site);
    let result = crawl(config, &roots(&["bayes"])).await;

    assert!(matches!(result, Err(MirrorError::DataShape(_))), "got {:?}", result.map(|o| o.counters));
}

#[tokio::test]
async fn test_payload_without_page_aborts_crawl() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(&mock_server, "bayes", json!({ "pages": {} }), 1).await;

    let config = create_test_config(&mock_server.uri(), &cache, &site);
    let result = crawl(config, &roots(&["bayes"])).await;

    assert!(matches!(result, Err(MirrorError::DataShape(_))), "got {:?}", result.map(|o| o.counters));
    assert!(!FsStore::new(cache.path()).contains("bayes", None));
}

#[tokio::test]
async fn test_site_links_crawled_pages() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "bayes",
        page_payload("1", "bayes", "Bayes' rule", "See [odds].", json!({"childIds": ["2"]})),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "2",
        page_payload("2", "odds", "Odds", "Back to [bayes].", json!({"parentIds": ["1"]})),
        1,
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), &cache, &site);
    config.crawl.recursive = true;

    let outcome = crawl(config.clone(), &roots(&["bayes"])).await.unwrap();
    let renderer = TextRenderer::new(&config.source.domain).unwrap();
    let summary = write_site(&outcome, &config, &renderer).unwrap();

    assert_eq!(summary.pages, 2);
    assert!(summary.missing_links.is_empty());

    let bayes = std::fs::read_to_string(site.path().join("page/bayes.html")).unwrap();
    assert!(bayes.contains(r#"<a href="odds.html">Odds</a>"#));

    let odds = std::fs::read_to_string(site.path().join("page/odds.html")).unwrap();
    assert!(odds.contains(r#"<nav class="breadcrumbs"><a href="bayes.html">Bayes&#39; rule</a></nav>"#));
    assert!(site.path().join("index.html").exists());
}
