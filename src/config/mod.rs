//! Configuration module for wiki-mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so an empty file (or no file at all) is valid.
//!
//! # Example
//!
//! ```no_run
//! use wiki_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {}", config.source.domain);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, CrawlConfig, DiscoveryConfig, OutputConfig, RenderConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, fingerprint_config, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
