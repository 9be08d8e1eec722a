//! Remote page fetching
//!
//! This module talks to the source site's JSON API:
//! - Building the HTTP client with the configured user agent and timeout
//! - `POST /json/primaryPage/` for the current edit of a page
//! - `POST /json/edit/` for a specific historical edit
//! - Error classification into recoverable fetch failures

use crate::config::SourceConfig;
use crate::{ConfigError, FetchError, MirrorError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const PAGE_ENDPOINT: &str = "json/primaryPage/";
const EDIT_ENDPOINT: &str = "json/edit/";

/// Source of raw page payloads
///
/// Recoverable failures come back as [`MirrorError::Fetch`]; anything else
/// (an undecodable body, for instance) aborts the crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the current edit of the page known by `key` (id or alias)
    async fn fetch_page(&self, key: &str) -> Result<Value, MirrorError>;

    /// Fetches edit number `edit` of the page with id `page_id`
    async fn fetch_edit(&self, page_id: &str, edit: u32) -> Result<Value, MirrorError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The source site configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.timeout_ms);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by the source site's JSON API
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    page_url: Url,
    edit_url: Url,
}

impl HttpFetcher {
    /// Creates a fetcher for the configured source
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Ready to fetch
    /// * `Err(MirrorError)` - Invalid base URL or client build failure
    pub fn new(config: &SourceConfig) -> Result<Self, MirrorError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let endpoint = |path: &str| {
            base.join(path)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}{}: {}", base, path, e)))
        };

        Ok(Self {
            client: build_http_client(config)?,
            page_url: endpoint(PAGE_ENDPOINT)?,
            edit_url: endpoint(EDIT_ENDPOINT)?,
        })
    }

    async fn post(&self, url: &Url, body: Value) -> Result<Value, MirrorError> {
        tracing::debug!("POST {} {}", url, body);

        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            MirrorError::DataShape(format!("response from {} is not JSON: {}", url, e))
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, key: &str) -> Result<Value, MirrorError> {
        self.post(&self.page_url, json!({ "pageAlias": key })).await
    }

    async fn fetch_edit(&self, page_id: &str, edit: u32) -> Result<Value, MirrorError> {
        self.post(
            &self.edit_url,
            json!({ "pageAlias": page_id, "specificEdit": edit }),
        )
        .await
    }
}

/// Maps a transport error to a recoverable fetch failure
fn classify_error(url: &Url, error: reqwest::Error) -> MirrorError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }.into()
    } else if error.is_connect() {
        FetchError::Network {
            url,
            message: "Connection refused".to_string(),
        }
        .into()
    } else {
        FetchError::Network {
            url,
            message: error.to_string(),
        }
        .into()
    }
}
