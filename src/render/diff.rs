//! Revision diffs
//!
//! Compares a page edit with the nearest earlier revision that was actually
//! downloaded. Title, blurb and body are diffed together so metadata edits
//! show up alongside text edits.

use crate::page::{Page, PageReference};
use crate::render::markdown::escape_html;
use similar::{Algorithm, ChangeTag, TextDiff};

/// Word-level diff of two page edits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDiff {
    /// Characters in inserted spans
    pub added: usize,
    /// Characters in deleted spans
    pub removed: usize,
    /// Inline HTML with `<ins>`/`<del>` highlights
    pub html: String,
    /// Edit number the diff was taken against, `None` for the empty text
    pub base_edit: Option<u32>,
}

impl PageDiff {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Diffs `page` against the nearest downloaded prior revision
///
/// # Arguments
///
/// * `page` - The edit to diff (current page or downloaded revision)
/// * `history` - Revision slots of the owning page, slot `n - 1` holding edit `n`
/// * `edit_cost` - Equal runs shorter than this between two changes are folded
///   into the change
pub fn diff_against_history(page: &Page, history: &[PageReference], edit_cost: usize) -> PageDiff {
    let previous = (1..page.edit_number())
        .rev()
        .find_map(|edit| history.get(edit as usize - 1).and_then(PageReference::as_page));

    let old = previous.map(diff_source).unwrap_or_default();
    let mut diff = diff_text(&old, &diff_source(page), edit_cost);
    diff.base_edit = previous.map(Page::edit_number);
    diff
}

/// Diffs two texts word by word
pub fn diff_text(old: &str, new: &str, edit_cost: usize) -> PageDiff {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_words(old, new);

    let mut runs: Vec<(ChangeTag, String)> = Vec::new();
    for change in diff.iter_all_changes() {
        match runs.last_mut() {
            Some((tag, text)) if *tag == change.tag() => text.push_str(change.value()),
            _ => runs.push((change.tag(), change.value().to_string())),
        }
    }

    let runs = fold_short_equalities(runs, edit_cost);

    let mut result = PageDiff::default();
    for (tag, text) in &runs {
        let escaped = escape_html(text).replace('\n', "<br>");
        match tag {
            ChangeTag::Equal => result.html.push_str(&escaped),
            ChangeTag::Insert => {
                result.added += text.chars().count();
                result.html.push_str(&format!("<ins>{}</ins>", escaped));
            }
            ChangeTag::Delete => {
                result.removed += text.chars().count();
                result.html.push_str(&format!("<del>{}</del>", escaped));
            }
        }
    }
    result
}

/// Text compared for one edit: title, blurb and body, each followed by a blank line
fn diff_source(page: &Page) -> String {
    format!("{}\n\n{}\n\n{}\n\n", page.title, page.clickbait, page.text)
}

/// Folds equal runs shorter than `edit_cost` between two changes into them
///
/// The result has at most one deletion followed by one insertion between
/// consecutive equal runs.
fn fold_short_equalities(
    runs: Vec<(ChangeTag, String)>,
    edit_cost: usize,
) -> Vec<(ChangeTag, String)> {
    let mut folded = Vec::with_capacity(runs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for (i, (tag, text)) in runs.iter().enumerate() {
        match tag {
            ChangeTag::Delete => deleted.push_str(text),
            ChangeTag::Insert => inserted.push_str(text),
            ChangeTag::Equal => {
                let change_before = !deleted.is_empty() || !inserted.is_empty();
                let change_after = runs
                    .get(i + 1)
                    .is_some_and(|(next, _)| *next != ChangeTag::Equal);

                if change_before && change_after && text.chars().count() < edit_cost {
                    deleted.push_str(text);
                    inserted.push_str(text);
                } else {
                    flush_changes(&mut folded, &mut deleted, &mut inserted);
                    folded.push((ChangeTag::Equal, text.clone()));
                }
            }
        }
    }
    flush_changes(&mut folded, &mut deleted, &mut inserted);
    folded
}

fn flush_changes(
    folded: &mut Vec<(ChangeTag, String)>,
    deleted: &mut String,
    inserted: &mut String,
) {
    if !deleted.is_empty() {
        folded.push((ChangeTag::Delete, std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        folded.push((ChangeTag::Insert, std::mem::take(inserted)));
    }
}
