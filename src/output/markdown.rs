//! Markdown crawl report generation
//!
//! This module generates a human-readable markdown report of one crawl run,
//! including run counters, site output and consolidated fetch failures.

use crate::cache::FailureMap;
use crate::crawler::{CrawlCounters, CrawlOutcome};
use crate::output::{write_file, OutputResult, SiteSummary};
use std::path::Path;

/// Missing links listed in full before the rest are counted
const MISSING_LINKS_SHOWN: usize = 50;

/// Everything the report shows about one run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub counters: CrawlCounters,
    pub failures: FailureMap,
    /// Fully fetched pages in the index
    pub pages: usize,
    /// Distinct keys in the index
    pub keys: usize,
    /// Site output, when the site was written
    pub site: Option<SiteSummary>,
    pub config_hash: String,
}

impl CrawlReport {
    /// Builds a report from a finished crawl
    pub fn new(outcome: &CrawlOutcome, site: Option<SiteSummary>, config_hash: &str) -> Self {
        Self {
            counters: outcome.counters.clone(),
            failures: outcome.failures.clone(),
            pages: outcome.index.page_count(),
            keys: outcome.index.key_count(),
            site,
            config_hash: config_hash.to_string(),
        }
    }
}

/// Generates a markdown report of a crawl
///
/// # Arguments
///
/// * `report` - The crawl report data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    write_file(output_path, &format_markdown_report(report))
}

/// Formats a crawl report as markdown
///
/// # Arguments
///
/// * `report` - The crawl report data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let counters = &report.counters;
    let mut md = String::new();

    md.push_str("# Wiki Mirror Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(started) = &counters.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = &counters.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = counters.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", report.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages**: {}\n", report.pages));
    md.push_str(&format!("- **Known Keys**: {}\n", report.keys));
    md.push_str(&format!("- **Items Processed**: {}\n", counters.processed));
    md.push_str(&format!("- **Failures**: {}\n\n", report.failures.len()));

    md.push_str("## Retrieval Breakdown\n\n");
    md.push_str("| Source | Pages | Revisions |\n");
    md.push_str("|--------|-------|-----------|\n");
    md.push_str(&format!(
        "| Fetched | {} | {} |\n",
        counters.fetched, counters.revisions_fetched
    ));
    md.push_str(&format!(
        "| Cache | {} | {} |\n",
        counters.loaded_from_cache, counters.revisions_from_cache
    ));
    md.push_str(&format!("| Failed this run | {} | |\n", counters.failed));
    md.push_str(&format!(
        "| Skipped (earlier failure) | {} | |\n\n",
        counters.skipped
    ));

    if let Some(site) = &report.site {
        md.push_str("## Site\n\n");
        md.push_str(&format!("- **Page Views**: {}\n", site.pages));
        md.push_str(&format!("- **Revisions Diffed**: {}\n", site.revisions));
        md.push_str(&format!("- **Math Fragments**: {}\n", site.latex_fragments));
        md.push_str(&format!(
            "- **Missing Links**: {}\n\n",
            site.missing_links.len()
        ));

        if !site.skipped.is_empty() {
            md.push_str("### Pages Not Written\n\n");
            for key in &site.skipped {
                md.push_str(&format!("- `{}`\n", key));
            }
            md.push('\n');
        }

        if !site.missing_links.is_empty() {
            md.push_str("### Missing Links\n\n");
            for link in site.missing_links.iter().take(MISSING_LINKS_SHOWN) {
                md.push_str(&format!("- `{}`\n", link));
            }
            if site.missing_links.len() > MISSING_LINKS_SHOWN {
                md.push_str(&format!(
                    "\n... and {} more\n\n",
                    site.missing_links.len() - MISSING_LINKS_SHOWN
                ));
            } else {
                md.push('\n');
            }
        }
    }

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| Page | Edit | Kind | Message |\n");
        md.push_str("|------|------|------|---------|\n");
        for (identity, edit, failure) in report.failures.iter() {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                identity,
                edit.map(|e| e.to_string()).unwrap_or_else(|| "current".to_string()),
                failure.kind,
                failure.message.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FailureKind, FetchFailure};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_report() -> CrawlReport {
        let counters = CrawlCounters {
            processed: 12,
            fetched: 7,
            loaded_from_cache: 3,
            revisions_fetched: 2,
            failed: 1,
            started_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            finished_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap()),
            ..CrawlCounters::default()
        };
        let mut failures = FailureMap::new();
        failures.record(
            "broken_page",
            None,
            FetchFailure {
                kind: FailureKind::HttpStatus,
                message: "HTTP 404 for https://example.com/json/primaryPage/".to_string(),
                status: Some(404),
            },
        );

        CrawlReport {
            counters,
            failures,
            pages: 10,
            keys: 31,
            site: None,
            config_hash: "abc123".to_string(),
        }
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("# Wiki Mirror Crawl Report"));
        assert!(markdown.contains("- **Duration**: 120 seconds (2.00 minutes)"));
        assert!(markdown.contains("- **Config Hash**: abc123"));
        assert!(markdown.contains("| Fetched | 7 | 2 |"));
        assert!(markdown.contains("| Cache | 3 | 0 |"));
        assert!(!markdown.contains("## Site"));
    }

    #[test]
    fn test_failures_are_consolidated() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("## Failures"));
        assert!(markdown.contains("| broken_page | current | http_status |"));
    }

    #[test]
    fn test_report_with_site() {
        let mut report = create_test_report();
        let mut site = SiteSummary {
            pages: 10,
            ..SiteSummary::default()
        };
        site.missing_links.insert("[nowhere]".to_string());
        report.site = Some(site);

        let markdown = format_markdown_report(&report);
        assert!(markdown.contains("- **Missing Links**: 1"));
        assert!(markdown.contains("- `[nowhere]`"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site").join("report.md");

        generate_markdown_report(&create_test_report(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Wiki Mirror Crawl Report"));
    }
}
