//! Text rendering
//!
//! Turns page markup into HTML in one pass over the text:
//!
//! 1. comment blocks are cut out and emitted inert
//! 2. math spans are escaped and framed with markers
//! 3. the remaining text has source-site URLs and bracket links resolved
//!
//! The processed markdown is then handed to [`markdown_to_html`]. The
//! revision diff engine lives in [`diff`].

mod comments;
pub mod diff;
mod links;
pub mod markdown;
mod math;

pub use diff::{diff_against_history, diff_text, PageDiff};
pub use markdown::{escape_html, markdown_to_html};

use crate::page::PageIndex;
use links::LinkResolver;
use std::collections::BTreeSet;

/// Output of rendering one piece of markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedText {
    /// Final HTML
    pub html: String,
    /// Bracket matches and URL keys that didn't resolve, sorted and unique
    pub missing_links: Vec<String>,
    /// Rendered HTML of each math fragment, in order of appearance
    pub latex: Vec<String>,
}

/// Renders page markup against a page index
#[derive(Debug, Clone)]
pub struct TextRenderer {
    links: LinkResolver,
}

impl TextRenderer {
    /// Creates a renderer for pages mirrored from `source_domain`
    ///
    /// # Arguments
    ///
    /// * `source_domain` - Host whose `/p/<key>/` URLs are rewritten locally
    pub fn new(source_domain: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            links: LinkResolver::new(source_domain)?,
        })
    }

    /// Renders markup to HTML
    ///
    /// # Arguments
    ///
    /// * `text` - Page markup
    /// * `index` - Index used to resolve links
    ///
    /// # Returns
    ///
    /// The HTML together with unresolved links and math fragments
    pub fn render(&self, text: &str, index: &PageIndex) -> RenderedText {
        let mut missing = BTreeSet::new();
        let mut latex = Vec::new();
        let markdown = self.render_markdown(text, index, &mut missing, &mut latex);

        RenderedText {
            html: markdown_to_html(&markdown),
            missing_links: missing.into_iter().collect(),
            latex,
        }
    }

    /// Resolves comments, math and links, returning markdown
    ///
    /// Unresolved links are added to `missing` and rendered math fragments
    /// appended to `latex`.
    pub fn render_markdown(
        &self,
        text: &str,
        index: &PageIndex,
        missing: &mut BTreeSet<String>,
        latex: &mut Vec<String>,
    ) -> String {
        let mut output = String::with_capacity(text.len() + text.len() / 4);
        let mut rest = text;

        while let Some(comment) = comments::find_comment(rest) {
            self.render_segment(&mut output, &rest[..comment.start], index, missing, latex);
            output.push_str(&comments::render_comment(&rest[comment.clone()]));
            rest = &rest[comment.end..];
        }
        self.render_segment(&mut output, rest, index, missing, latex);

        output
    }

    /// Renders text free of comment blocks
    fn render_segment(
        &self,
        output: &mut String,
        segment: &str,
        index: &PageIndex,
        missing: &mut BTreeSet<String>,
        latex: &mut Vec<String>,
    ) {
        let mut rest = segment;

        while let Some(span) = math::find_math(rest) {
            self.render_plain(output, &rest[..span.start], index, missing);

            let framed = format!(
                "{marker}{math}{marker}",
                marker = math::MATH_MARKER,
                math = math::escape_math(&rest[span.clone()])
            );
            latex.push(markdown_to_html(&framed));
            output.push_str(&framed);
            rest = &rest[span.end..];
        }
        self.render_plain(output, rest, index, missing);
    }

    fn render_plain(
        &self,
        output: &mut String,
        text: &str,
        index: &PageIndex,
        missing: &mut BTreeSet<String>,
    ) {
        if text.is_empty() {
            return;
        }
        let rewritten = self.links.rewrite_source_urls(text, index, missing);
        self.links.render_links(output, &rewritten, index, missing);
    }
}
