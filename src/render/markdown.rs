//! Markdown to HTML conversion
//!
//! Thin wrapper over `pulldown-cmark` which adds bare-URL autolinking:
//! `http(s)://...` runs in plain text become links, except inside existing
//! links, code blocks and raw `<a>` elements.

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

/// Converts markdown to HTML with bare URLs linked
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = autolink(coalesce_text(Parser::new_ext(markdown, options)));

    let mut output = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

/// Escapes text for use inside HTML content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn bare_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"'`]+"#).expect("bare URL pattern is valid")
    })
}

/// Merges adjacent text events so URLs split by the parser are seen whole
fn coalesce_text<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut merged: Vec<Event<'a>> = Vec::new();
    for event in events {
        match (merged.last_mut(), event) {
            (Some(Event::Text(previous)), Event::Text(text)) => {
                let joined = format!("{}{}", previous, text);
                *previous = CowStr::from(joined);
            }
            (_, event) => merged.push(event),
        }
    }
    merged
}

fn autolink(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut output = Vec::with_capacity(events.len());
    let mut link_depth = 0usize;
    let mut anchor_depth = 0usize;
    let mut in_code_block = false;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link | TagEnd::Image) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::InlineHtml(raw) | Event::Html(raw) => {
                let tag = raw.trim_start().to_ascii_lowercase();
                if tag.starts_with("<a ") || tag.starts_with("<a>") {
                    anchor_depth += 1;
                } else if tag.starts_with("</a") {
                    anchor_depth = anchor_depth.saturating_sub(1);
                }
            }
            Event::Text(text) if link_depth == 0 && anchor_depth == 0 && !in_code_block => {
                if bare_url_pattern().is_match(text) {
                    split_urls(text, &mut output);
                    continue;
                }
            }
            _ => {}
        }
        output.push(event);
    }

    output
}

fn split_urls(text: &str, output: &mut Vec<Event<'_>>) {
    let mut last = 0;
    for found in bare_url_pattern().find_iter(text) {
        let url = found
            .as_str()
            .trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'));
        if url.len() <= "https://".len() {
            continue;
        }
        let start = found.start();
        let end = start + url.len();

        if start > last {
            output.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        output.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        output.push(Event::Text(CowStr::from(url.to_string())));
        output.push(Event::End(TagEnd::Link));
        last = end;
    }
    if last < text.len() {
        output.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}
