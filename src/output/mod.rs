//! Output module for generating the mirror site and crawl reports
//!
//! This module handles:
//! - Writing the static HTML site (pages, metadata views, diffs, indexes)
//! - Generating the markdown crawl report
//! - Loading and printing cache statistics

mod markdown;
mod site;
pub mod stats;

pub use markdown::{format_markdown_report, generate_markdown_report, CrawlReport};
pub use site::{group_by_type, write_site, SiteSummary, SiteWriter};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes `contents` to `path`, creating parent directories as needed
pub(crate) fn write_file(path: &Path, contents: &str) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OutputError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}
