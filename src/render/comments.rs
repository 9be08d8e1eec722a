//! Comment directive blocks
//!
//! `%%comment: ... %%` and `%%%comment: ... %%%` blocks are editor notes.
//! They are shown verbatim, so every character the markdown converter or the
//! link scanner could act on is emitted as a numeric entity.

use std::ops::Range;

const DIRECTIVE: &str = "%%comment:";

/// Finds the first complete comment block in `text`
///
/// The closing delimiter must match the opening one (`%%` or `%%%`). An
/// opener without a closer is ordinary text.
pub(crate) fn find_comment(text: &str) -> Option<Range<usize>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(DIRECTIVE) {
        let found = from + offset;
        let (start, delimiter) = if text[..found].ends_with('%') {
            (found - 1, "%%%")
        } else {
            (found, "%%")
        };

        let body_start = found + DIRECTIVE.len();
        if let Some(close) = text[body_start..].find(delimiter) {
            return Some(start..body_start + close + delimiter.len());
        }
        from = body_start;
    }
    None
}

/// Renders a comment block as an inert span
pub(crate) fn render_comment(block: &str) -> String {
    let mut output = String::with_capacity(block.len() * 2 + 32);
    output.push_str(r#"<span class="comment">"#);
    for ch in block.chars() {
        if is_significant(ch) {
            output.push_str(&format!("&#{};", ch as u32));
        } else {
            output.push(ch);
        }
    }
    output.push_str("</span>");
    output
}

fn is_significant(ch: char) -> bool {
    matches!(
        ch,
        '\\' | '`'
            | '*'
            | '_'
            | '{'
            | '}'
            | '['
            | ']'
            | '('
            | ')'
            | '#'
            | '+'
            | '-'
            | '.'
            | '!'
            | '<'
            | '>'
            | '&'
            | '"'
            | '\''
            | '$'
            | '%'
            | '|'
            | '~'
            | '='
            | ':'
            | '\n'
            | '\r'
    )
}
