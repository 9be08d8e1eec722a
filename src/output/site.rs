//! Static site generation
//!
//! Lays the crawled pages out as plain HTML files:
//! - `page/<key>.html` - breadcrumbs, title, summary and rendered body
//! - `meta/<key>.html` - ids, type, authorship and related page lists
//! - `diff/<key>.html` - the current edit and each downloaded revision diffed
//!   against its nearest downloaded predecessor
//! - `index.html` - every known page grouped by type
//! - `debug.html` - unresolved links, math fragments and fetch failures
//!
//! Page views link to each other with bare `<key>.html` hrefs, so every
//! view of one kind lives in the same directory.

use crate::cache::FailureMap;
use crate::config::{Config, RenderConfig};
use crate::crawler::CrawlOutcome;
use crate::output::{write_file, OutputResult};
use crate::page::{Page, PageIndex, PageReference};
use crate::render::{escape_html, PageDiff, TextRenderer};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const MATHJAX_VERSION: &str = "2.7.5";

/// What a site write produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSummary {
    /// Page views written (one per fully fetched page)
    pub pages: usize,
    /// Downloaded revisions shown on diff views
    pub revisions: usize,
    /// Keys that can't be used as file names
    pub skipped: Vec<String>,
    /// Unresolved link targets across the whole site
    pub missing_links: BTreeSet<String>,
    /// Number of rendered math fragments
    pub latex_fragments: usize,
}

/// Writes the site for one crawl outcome
///
/// # Arguments
///
/// * `outcome` - Index and failures of a finished crawl
/// * `config` - Effective configuration; the site goes to `output.directory`
/// * `renderer` - Renderer for page markup
///
/// # Returns
///
/// * `Ok(SiteSummary)` - Site written
/// * `Err(OutputError)` - A file couldn't be written
pub fn write_site(
    outcome: &CrawlOutcome,
    config: &Config,
    renderer: &TextRenderer,
) -> OutputResult<SiteSummary> {
    SiteWriter::new(&config.output.directory, config, renderer, &outcome.index)
        .write(&outcome.failures)
}

/// Renders the views of one page index into a directory
pub struct SiteWriter<'a> {
    root: PathBuf,
    domain: &'a str,
    render: &'a RenderConfig,
    renderer: &'a TextRenderer,
    index: &'a PageIndex,
}

impl<'a> SiteWriter<'a> {
    pub fn new(
        root: impl AsRef<Path>,
        config: &'a Config,
        renderer: &'a TextRenderer,
        index: &'a PageIndex,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            domain: &config.source.domain,
            render: &config.render,
            renderer,
            index,
        }
    }

    /// Writes every view
    pub fn write(&self, failures: &FailureMap) -> OutputResult<SiteSummary> {
        let mut summary = SiteSummary::default();
        let mut missing: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut latex: Vec<(&str, &[String])> = Vec::new();

        for page in self.index.pages() {
            let key = page.alias_or_id();
            if !is_file_safe(key) {
                tracing::warn!("Not writing page '{}': key is not a usable file name", key);
                summary.skipped.push(key.to_string());
                continue;
            }

            let rendered = page.rendered(self.renderer, self.index);
            for link in &rendered.missing_links {
                missing
                    .entry(link.clone())
                    .or_default()
                    .insert(key.to_string());
            }
            if !rendered.latex.is_empty() {
                latex.push((key, rendered.latex.as_slice()));
            }
            summary.latex_fragments += rendered.latex.len();

            write_file(&self.view_path("page", key), &self.page_view(page))?;
            write_file(&self.view_path("meta", key), &self.meta_view(page))?;
            write_file(&self.view_path("diff", key), &self.diff_view(page))?;

            summary.pages += 1;
            summary.revisions += page.history.iter().filter(|r| r.is_full()).count();
            tracing::trace!("Wrote views for {}", key);
        }

        write_file(&self.root.join("index.html"), &self.index_view())?;
        write_file(
            &self.root.join("debug.html"),
            &self.debug_view(&missing, &latex, failures),
        )?;

        summary.missing_links = missing.into_keys().collect();
        tracing::info!(
            "Wrote {} pages ({} revisions) to {}",
            summary.pages,
            summary.revisions,
            self.root.display()
        );
        Ok(summary)
    }

    fn view_path(&self, kind: &str, key: &str) -> PathBuf {
        self.root.join(kind).join(format!("{}.html", key))
    }

    fn page_view(&self, page: &Page) -> String {
        let key = page.alias_or_id();
        let mut body = String::new();

        for trail in page.breadcrumbs(self.index) {
            body.push_str("<nav class=\"breadcrumbs\">");
            let links: Vec<String> = trail
                .iter()
                .map(|crumb| {
                    format!(
                        r#"<a href="{}.html">{}</a>"#,
                        escape_html(&crumb.key),
                        escape_html(&crumb.name)
                    )
                })
                .collect();
            body.push_str(&links.join(" &gt; "));
            body.push_str("</nav>\n");
        }

        let _ = writeln!(body, "<h1>{}</h1>", escape_html(page.display_name()));
        let summary = page.summary(self.renderer, self.index, self.render.summary_max_length);
        if !summary.trim().is_empty() {
            let _ = writeln!(body, "<div class=\"summary\">{}</div>", summary);
        }
        let _ = writeln!(
            body,
            "<div class=\"page-text\">{}</div>",
            page.rendered(self.renderer, self.index).html
        );
        let _ = writeln!(
            body,
            r#"<p class="page-links"><a href="../meta/{k}.html">metadata</a> | <a href="../diff/{k}.html">changes</a> | <a href="{url}">original</a></p>"#,
            k = escape_html(key),
            url = escape_html(&page.canonical_url(self.domain))
        );

        layout("../", page.display_name(), &body)
    }

    fn meta_view(&self, page: &Page) -> String {
        let mut body = String::new();
        let _ = writeln!(
            body,
            r#"<h1><a href="../page/{}.html">{}</a></h1>"#,
            escape_html(page.alias_or_id()),
            escape_html(page.display_name())
        );

        body.push_str("<dl class=\"meta\">\n");
        let mut field = |name: &str, value: String| {
            let _ = writeln!(body, "<dt>{}</dt><dd>{}</dd>", name, value);
        };
        field("Page id", escape_html(page.page_id()));
        field("Alias", escape_html(page.alias_or_id()));
        field("Type", escape_html(&self.type_of_page(page)));
        field("Edit", page.edit.to_string());
        if let Some(creator) = &page.creator_id {
            field("Created by", self.link_list(std::slice::from_ref(creator), "../"));
        }
        if let Some(created) = page.created_at {
            field("Created at", created.to_string());
        }
        if let Some(edited) = page.edited_at {
            field("Last edited at", edited.to_string());
        }
        field(
            "Source",
            format!(
                r#"<a href="{url}">{url}</a>"#,
                url = escape_html(&page.canonical_url(self.domain))
            ),
        );
        field(
            "Cached",
            if page.cached { "yes" } else { "no" }.to_string(),
        );
        body.push_str("</dl>\n");

        for (heading, ids) in [
            ("Parents", &page.parent_ids),
            ("Children", &page.child_ids),
            ("Tags", &page.tag_ids),
            ("Related", &page.related_ids),
            ("Comments", &page.comment_ids),
            ("Authors", &page.creator_ids),
            ("Liked by", &page.liker_ids),
        ] {
            if ids.is_empty() {
                continue;
            }
            let _ = writeln!(
                body,
                "<h2>{} ({})</h2>\n{}",
                heading,
                ids.len(),
                self.link_list(ids, "../")
            );
        }

        layout("../", page.display_name(), &body)
    }

    fn diff_view(&self, page: &Page) -> String {
        let cost = self.render.diff_edit_cost;
        let mut body = String::new();
        let _ = writeln!(
            body,
            r#"<h1>Changes to <a href="../page/{}.html">{}</a></h1>"#,
            escape_html(page.alias_or_id()),
            escape_html(page.display_name())
        );

        diff_section(&mut body, page, page.diff(&page.history, cost));
        for revision in page.history.iter().rev().filter_map(PageReference::as_page) {
            diff_section(&mut body, revision, revision.diff(&page.history, cost));
        }

        layout("../", page.display_name(), &body)
    }

    fn index_view(&self) -> String {
        let mut body = String::from("<h1>Index</h1>\n");
        let references: Vec<&PageReference> = self.indexed_references();

        for (page_type, members) in group_by_type(references, self.render) {
            let _ = writeln!(
                body,
                "<h2>{} ({})</h2>\n<ul>",
                escape_html(&page_type),
                members.len()
            );
            for reference in members {
                let _ = writeln!(body, "<li>{}</li>", self.reference_link(reference, ""));
            }
            body.push_str("</ul>\n");
        }

        layout("", "Index", &body)
    }

    fn debug_view(
        &self,
        missing: &BTreeMap<String, BTreeSet<String>>,
        latex: &[(&str, &[String])],
        failures: &FailureMap,
    ) -> String {
        let mut body = String::from("<h1>Debug</h1>\n");

        let _ = writeln!(body, "<h2>Missing links ({})</h2>\n<ul>", missing.len());
        for (link, pages) in missing {
            let used_by: Vec<String> = pages
                .iter()
                .map(|key| format!(r#"<a href="page/{k}.html">{k}</a>"#, k = escape_html(key)))
                .collect();
            let _ = writeln!(
                body,
                "<li><code>{}</code> in {}</li>",
                escape_html(link),
                used_by.join(", ")
            );
        }
        body.push_str("</ul>\n");

        let fragments: usize = latex.iter().map(|(_, fragments)| fragments.len()).sum();
        let _ = writeln!(body, "<h2>Math ({})</h2>", fragments);
        for (key, fragments) in latex {
            let _ = writeln!(
                body,
                r#"<h3><a href="page/{k}.html">{k}</a></h3>"#,
                k = escape_html(key)
            );
            for fragment in fragments.iter() {
                let _ = writeln!(body, "<div class=\"latex\">{}</div>", fragment);
            }
        }

        let _ = writeln!(
            body,
            "<h2>Failures ({})</h2>\n<table>\n<tr><th>Page</th><th>Edit</th><th>Kind</th><th>Message</th></tr>",
            failures.len()
        );
        for (identity, edit, failure) in failures.iter() {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(identity),
                edit.map(|e| e.to_string()).unwrap_or_else(|| "current".to_string()),
                failure.kind,
                escape_html(&failure.message)
            );
        }
        body.push_str("</table>\n");

        layout("", "Debug", &body)
    }

    /// Current-edit references worth listing, one per page
    fn indexed_references(&self) -> Vec<&'a PageReference> {
        let mut seen = HashSet::new();
        self.index
            .references()
            .filter(|reference| reference.requested_edit().is_none())
            .filter(|reference| match reference.as_page() {
                Some(page) => page.is_named(&self.render.namelike_page_ids),
                None => true,
            })
            .filter(|reference| {
                let identity = reference.page_id().unwrap_or(reference.alias_or_id());
                seen.insert(identity.to_string())
            })
            .collect()
    }

    fn type_of_page(&self, page: &Page) -> String {
        if page.page_type.is_empty() {
            self.render.default_type.clone()
        } else {
            page.page_type.clone()
        }
    }

    /// `<ul>` of links to the pages behind `ids`
    fn link_list(&self, ids: &[String], root: &str) -> String {
        let mut html = String::from("<ul>");
        for id in ids {
            let item = match self.index.get(id) {
                Some(reference) => self.reference_link(reference, root),
                None => escape_html(id),
            };
            let _ = write!(html, "<li>{}</li>", item);
        }
        html.push_str("</ul>");
        html
    }

    /// Link to the local page view, or to the source site when not fetched
    fn reference_link(&self, reference: &PageReference, root: &str) -> String {
        let key = reference.alias_or_id();
        let href = if reference.is_full() && is_file_safe(key) {
            format!("{}page/{}.html", root, key)
        } else {
            format!("https://{}/p/{}/", self.domain, key)
        };
        format!(
            r#"<a href="{}">{}</a>"#,
            escape_html(&href),
            escape_html(reference.name())
        )
    }
}

/// Groups references by page type
///
/// Groups follow `type_sort_order`; types missing from it come after, in
/// name order. References without a known type fall under `default_type`.
/// Members are sorted by name.
pub fn group_by_type<'r>(
    references: Vec<&'r PageReference>,
    config: &RenderConfig,
) -> Vec<(String, Vec<&'r PageReference>)> {
    let mut groups: BTreeMap<String, Vec<&'r PageReference>> = BTreeMap::new();
    for reference in references {
        let page_type = reference
            .page_type()
            .unwrap_or(config.default_type.as_str())
            .to_string();
        groups.entry(page_type).or_default().push(reference);
    }

    let rank = |page_type: &str| {
        config
            .type_sort_order
            .iter()
            .position(|known| known == page_type)
            .unwrap_or(config.type_sort_order.len())
    };

    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|(a, _), (b, _)| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    for (_, members) in &mut groups {
        members.sort_by_key(|reference| reference.name().to_lowercase());
    }
    groups
}

fn diff_section(body: &mut String, page: &Page, diff: &PageDiff) {
    let against = match diff.base_edit {
        Some(edit) => format!("edit {}", edit),
        None => "the empty page".to_string(),
    };
    let _ = writeln!(
        body,
        "<h2>Edit {} against {} (+{} / -{})</h2>\n<div class=\"diff\">{}</div>",
        page.edit_number(),
        against,
        diff.added,
        diff.removed,
        diff.html
    );
}

/// True when `key` can be used as a file name inside a view directory
fn is_file_safe(key: &str) -> bool {
    !key.is_empty() && !key.starts_with('.') && !key.contains(['/', '\\'])
}

fn layout(root: &str, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script type="text/x-mathjax-config">MathJax.Hub.Config({{tex2jax: {{inlineMath: [['$','$']], displayMath: [['$$','$$']], processEscapes: true}}}});</script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/mathjax/{mathjax}/MathJax.js?config=TeX-AMS_HTML"></script>
</head>
<body>
<header><a href="{root}index.html">Index</a> | <a href="{root}debug.html">Debug</a></header>
<main>
{body}</main>
</body>
</html>
"#,
        title = escape_html(title),
        mathjax = MATHJAX_VERSION,
        root = root,
        body = body
    )
}
