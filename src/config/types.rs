use serde::{Deserialize, Serialize};

/// Main configuration structure for wiki-mirror
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote knowledge base the mirror is taken from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SourceConfig {
    /// Public domain of the source, used to rewrite absolute page URLs
    pub domain: String,

    /// Base URL of the JSON API
    pub base_url: String,

    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            domain: "arbital.com".to_string(),
            base_url: "https://arbital.com".to_string(),
            timeout_ms: 30_000,
            user_agent: concat!("wiki-mirror/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// On-disk raw payload cache
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Directory holding raw payloads and the metadata document
    pub directory: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: "cache".to_string(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlConfig {
    /// Follow every page reference discovered in fetched payloads
    pub recursive: bool,

    /// Also fetch every prior edit of each page
    pub history: bool,

    /// Never touch the network; every fetch fails immediately
    pub cache_only: bool,

    /// Retry identities that failed in a previous run
    pub retry_failed: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            history: false,
            cache_only: false,
            retry_failed: true,
        }
    }
}

/// Which payload fields are followed as page references
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiscoveryConfig {
    /// Fields holding page ids that don't follow the `...Id`/`...Ids` naming
    pub id_list_fields: Vec<String>,

    /// Id-shaped fields that never reference a page
    pub denylist: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            id_list_fields: vec!["individualLikes".to_string()],
            denylist: vec!["analyticsId".to_string()],
        }
    }
}

/// Text rendering and presentation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RenderConfig {
    /// Maximum length of a display name derived from a blurb or text
    pub name_max_length: usize,

    /// Maximum length of a summary derived from page text
    pub summary_max_length: usize,

    /// Equal runs shorter than this between two edits are folded into them
    pub diff_edit_cost: usize,

    /// Category used for references that were never fetched
    pub default_type: String,

    /// Order of categories on the index page
    pub type_sort_order: Vec<String>,

    /// Page ids that look like anonymous ids but are real names
    pub namelike_page_ids: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            name_max_length: 30,
            summary_max_length: 100,
            diff_edit_cost: 4,
            default_type: "no-type".to_string(),
            type_sort_order: ["wiki", "group", "comment", "question", "no-type"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            namelike_page_ids: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory the static site is written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "site".to_string(),
        }
    }
}
