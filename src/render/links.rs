//! Wiki link resolution
//!
//! Handles two kinds of references inside plain text segments:
//!
//! - absolute source-site URLs (`https://<domain>/p/<key>/`), rewritten to
//!   local `<key>.html` files
//! - bracket links (`[target]`, `[target display text]`, optionally prefixed
//!   with `-`, `@` or `+`), resolved against the page index

use crate::page::PageIndex;
use crate::render::markdown::escape_html;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Bracket directives that are markdown syntax rather than links
const DIRECTIVE_KEYWORDS: [&str; 5] = ["toc:", "summary:", "fixme:", "todo:", "comment:"];

/// Resolves source-site URLs and bracket links against a page index
#[derive(Debug, Clone)]
pub(crate) struct LinkResolver {
    source_url: Regex,
}

/// One bracket-link candidate, offsets relative to the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
struct BracketMatch<'a> {
    start: usize,
    end: usize,
    target: &'a str,
    space: Option<&'a str>,
    label: Option<&'a str>,
}

impl LinkResolver {
    /// Creates a resolver for links pointing at `source_domain`
    pub(crate) fn new(source_domain: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"https?://{}/p/([^/\s.!?;:)\]]*)/?",
            regex::escape(source_domain)
        );
        Ok(Self {
            source_url: Regex::new(&pattern)?,
        })
    }

    /// Rewrites absolute source-site page URLs to local files
    ///
    /// Keys are resolved case-insensitively; unresolved keys are recorded in
    /// `missing` and rewritten as-is.
    pub(crate) fn rewrite_source_urls<'t>(
        &self,
        text: &'t str,
        index: &PageIndex,
        missing: &mut BTreeSet<String>,
    ) -> Cow<'t, str> {
        self.source_url.replace_all(text, |caps: &Captures<'_>| {
            let key = &caps[1];
            if key.is_empty() {
                return caps[0].to_string();
            }
            match index.get(&key.to_lowercase()) {
                Some(page) => format!("{}.html", page.alias_or_id()),
                None => {
                    missing.insert(key.to_string());
                    format!("{}.html", key)
                }
            }
        })
    }

    /// Appends `segment` to `output` with every bracket link resolved
    ///
    /// `output` is the text rendered so far; the colon-directive and
    /// numeric-citation heuristics read its tail.
    pub(crate) fn render_links(
        &self,
        output: &mut String,
        segment: &str,
        index: &PageIndex,
        missing: &mut BTreeSet<String>,
    ) {
        let mut rest = segment;

        while let Some(found) = find_bracket_link(rest) {
            let before = &rest[..found.start];
            let full_match = &rest[found.start..found.end];
            output.push_str(before);

            if let Some(name) = visualization_name(found.target) {
                output.push_str(&format!(
                    r#"<div class="react-demo" data-demo-name="{}"></div>"#,
                    escape_html(name)
                ));
                rest = &rest[found.end..];
                continue;
            }

            if is_directive(found.target) {
                output.push('[');
                rest = &rest[found.start + 1..];
                continue;
            }

            let mut url = found.target.to_string();
            let mut label = found.label.map(ToString::to_string);

            if !found.target.contains("://") && !found.target.contains(".html") {
                let mut linked = index.get_exact(found.target);
                if linked.is_none() {
                    if let (Some(space), Some(text)) = (found.space, found.label) {
                        url = format!("{}{}{}", found.target, space, text);
                        label = None;
                        linked = index.get_exact(&url);
                    }
                }

                let rejected = match linked {
                    None => true,
                    Some(page) => {
                        page.page_type() != Some("wiki")
                            && is_numeric_reference(full_match)
                            && ends_in_word_char(output)
                    }
                };
                if rejected {
                    missing.insert(full_match.to_string());
                    output.push_str(&escape_underscores(full_match));
                    rest = &rest[found.end..];
                    continue;
                }

                if let Some(page) = linked {
                    url = format!("{}.html", page.alias_or_id());
                    label = label.or_else(|| Some(page.name().to_string()));
                }
            }

            let after = &rest[found.end..];
            if after.starts_with(':') && at_block_start(output) {
                output.push('[');
                rest = &rest[found.start + 1..];
                continue;
            }

            let text = label.unwrap_or_else(|| url.clone());
            output.push_str(&format!(
                r#"<a href="{}">{}</a>"#,
                escape_html(&url),
                escape_html(&text)
            ));
            rest = after;
        }

        output.push_str(rest);
    }
}

/// Finds the leftmost bracket link in `text`
///
/// Grammar: `[` (not after `\` or `]`), an optional `-`/`@`/`+` prefix, a
/// target without whitespace or `]`, then either `]` or whitespace, display
/// text and `]`. A closing bracket followed by `(` or `[` is ordinary
/// markdown link syntax and never matches.
fn find_bracket_link(text: &str) -> Option<BracketMatch<'_>> {
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        from = start + 1;

        if start > 0 && matches!(bytes[start - 1], b'\\' | b']') {
            continue;
        }
        if let Some(found) = parse_bracket_at(text, start) {
            return Some(found);
        }
    }
    None
}

fn parse_bracket_at(text: &str, start: usize) -> Option<BracketMatch<'_>> {
    let inner = &text[start + 1..];

    let mut target_start = 0;
    let mut chars = inner.chars();
    if let (Some(first), Some(second)) = (chars.next(), chars.next()) {
        if matches!(first, '-' | '@' | '+') && second != ']' && !second.is_whitespace() {
            target_start = first.len_utf8();
        }
    }

    let target_len = inner[target_start..]
        .find(|c: char| c == ']' || c.is_whitespace())
        .unwrap_or(inner.len() - target_start);
    if target_len == 0 {
        return None;
    }
    let target_end = target_start + target_len;
    let target = &inner[target_start..target_end];
    let after_target = &inner[target_end..];

    let (space, label, close) = if after_target.starts_with(']') {
        (None, None, target_end)
    } else {
        let space_len = after_target
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(after_target.len());
        let label_end = after_target.find(']')?;

        let (space, label) = if label_end > space_len {
            (&after_target[..space_len], &after_target[space_len..label_end])
        } else {
            // Whitespace runs up to `]`; the display text takes its last character
            let last = after_target[..label_end].chars().next_back()?;
            let split = label_end - last.len_utf8();
            if split == 0 {
                return None;
            }
            (&after_target[..split], &after_target[split..label_end])
        };
        (Some(space), Some(label), target_end + label_end)
    };

    let end = start + 1 + close + 1;
    if matches!(text.as_bytes().get(end), Some(b'(') | Some(b'[')) {
        return None;
    }

    Some(BracketMatch {
        start,
        end,
        target,
        space,
        label,
    })
}

/// Demo name of a `visualization(name):` directive
fn visualization_name(target: &str) -> Option<&str> {
    let name = target.strip_prefix("visualization(")?.strip_suffix("):")?;
    (!name.contains(')')).then_some(name)
}

fn is_directive(target: &str) -> bool {
    if DIRECTIVE_KEYWORDS.contains(&target) {
        return true;
    }
    target
        .strip_prefix("summary(")
        .and_then(|rest| rest.find(')').map(|close| &rest[close..]))
        .is_some_and(|rest| rest.starts_with("):"))
}

/// `[digits]` and nothing else
fn is_numeric_reference(full_match: &str) -> bool {
    full_match
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn ends_in_word_char(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// True for empty text or text whose trailing whitespace holds a line break
fn at_block_start(text: &str) -> bool {
    let trailing = &text[text.trim_end().len()..];
    text.is_empty() || trailing.contains('\n')
}

/// Backslash-escapes every underscore not already escaped
fn escape_underscores(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 4);
    let mut backslashes = 0usize;
    for ch in text.chars() {
        if ch == '_' && backslashes % 2 == 0 {
            escaped.push('\\');
        }
        backslashes = if ch == '\\' { backslashes + 1 } else { 0 };
        escaped.push(ch);
    }
    escaped
}
