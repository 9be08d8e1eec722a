//! Math span detection and escaping
//!
//! Math is left for a client-side typesetter, so the markdown converter must
//! pass it through untouched. Spans are escaped for markdown and framed with
//! an empty marker element on each side.

use std::ops::Range;

/// Empty element framing each math span
pub(crate) const MATH_MARKER: &str = "<span></span>";

/// Finds the earliest math span in `text`
///
/// `$$...$$` may span lines; `$...$` may not. Escaped dollars never open or
/// close a span, and a single `$` directly after an unescaped `$` doesn't
/// open one.
pub(crate) fn find_math(text: &str) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' || is_escaped(bytes, i) {
            i += 1;
            continue;
        }

        if bytes.get(i + 1) == Some(&b'$') {
            match find_block_close(bytes, i + 2) {
                Some(close) => return Some(i..close + 2),
                None => {
                    i += 2;
                    continue;
                }
            }
        }

        if let Some(close) = find_unescaped_dollar(bytes, i + 1) {
            if !bytes[i + 1..close].contains(&b'\n') {
                return Some(i..close + 1);
            }
        }
        i += 1;
    }
    None
}

/// Escapes a math span for the markdown converter
///
/// Backslashes are doubled first, then each of `* = # _ [ ]` gets a
/// backslash of its own.
pub(crate) fn escape_math(span: &str) -> String {
    let mut escaped = String::with_capacity(span.len() + span.len() / 4);
    for ch in span.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '*' | '=' | '#' | '_' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// True when the byte at `position` follows an odd run of backslashes
fn is_escaped(bytes: &[u8], position: usize) -> bool {
    let backslashes = bytes[..position]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

fn find_unescaped_dollar(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&j| bytes[j] == b'$' && !is_escaped(bytes, j))
}

fn find_block_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut j = from;
    while let Some(found) = find_unescaped_dollar(bytes, j) {
        if bytes.get(found + 1) == Some(&b'$') {
            return Some(found);
        }
        j = found + 1;
    }
    None
}
