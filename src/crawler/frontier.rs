//! Crawl frontier
//!
//! A LIFO stack of pending references plus the set of visitation keys
//! already resolved this run. A visitation key is a `(key, edit)` pair; a
//! reference counts as visited when any of its keys was marked for its edit.

use crate::page::PageReference;
use std::collections::HashSet;

/// Pending references and visited keys
#[derive(Debug, Default)]
pub struct Frontier {
    stack: Vec<PageReference>,
    visited: HashSet<(String, Option<u32>)>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a reference on top of the stack
    pub fn push(&mut self, reference: PageReference) {
        self.stack.push(reference);
    }

    /// Pushes references in order, so the last one pops first
    pub fn extend<I: IntoIterator<Item = PageReference>>(&mut self, references: I) {
        self.stack.extend(references);
    }

    /// Pops the most recently pushed reference
    pub fn pop(&mut self) -> Option<PageReference> {
        self.stack.pop()
    }

    /// Returns true if any key of `reference` was marked for its edit
    pub fn is_visited(&self, reference: &PageReference) -> bool {
        let edit = reference.requested_edit();
        reference
            .keys()
            .into_iter()
            .any(|key| self.visited.contains(&(key.to_string(), edit)))
    }

    /// Marks `keys` as resolved for `edit`
    pub fn mark_visited<'a, I>(&mut self, keys: I, edit: Option<u32>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.visited.insert((key.to_string(), edit));
        }
    }

    /// Number of pending references
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Number of marked visitation keys
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
