//! Global page index
//!
//! Maps every known key (id, alias, their lowercased forms, and title) to
//! the most complete reference seen for it. References live in an arena of
//! slots; keys point at slots, so in-place upgrades (revision history) are
//! visible through every key of a page.

use crate::page::reference::PageReference;
use crate::page::Page;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Index of every page reference known during a run
#[derive(Debug, Default)]
pub struct PageIndex {
    slots: Vec<PageReference>,
    keys: HashMap<String, usize>,
    alias_to_id: BTreeMap<String, String>,
}

impl PageIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index seeded with a persisted alias -> id map
    pub fn with_aliases(alias_to_id: BTreeMap<String, String>) -> Self {
        Self {
            alias_to_id,
            ..Self::default()
        }
    }

    /// Registers a reference under all of its keys
    ///
    /// For each key, the slot is replaced only when the new reference is
    /// strictly more complete than the current holder, so statuses never
    /// decrease and a full page is never demoted. When both alias and id are
    /// known, the pair is recorded in the alias -> id map.
    pub fn register(&mut self, reference: PageReference) {
        let identity = reference.identity();
        if let (Some(alias), Some(id)) = (&identity.alias, &identity.page_id) {
            if alias != id {
                self.alias_to_id.insert(alias.clone(), id.clone());
            }
        }

        let status = reference.status();
        let winning_keys: Vec<String> = index_keys(&reference)
            .into_iter()
            .filter(|key| match self.keys.get(key) {
                Some(&slot) => self.slots[slot].status() < status,
                None => true,
            })
            .collect();

        if winning_keys.is_empty() {
            return;
        }

        let slot = self.slots.len();
        self.slots.push(reference);
        for key in winning_keys {
            self.keys.insert(key, slot);
        }
    }

    /// Looks up the best reference known for a key
    pub fn get(&self, key: &str) -> Option<&PageReference> {
        self.slot_for(key).map(|slot| &self.slots[slot])
    }

    /// Looks up a key exactly as written, with no lowercase retry
    pub fn get_exact(&self, key: &str) -> Option<&PageReference> {
        self.keys.get(key).map(|&slot| &self.slots[slot])
    }

    /// Looks up a fully fetched page by any of its keys
    pub fn get_page(&self, key: &str) -> Option<&Page> {
        self.get(key).and_then(PageReference::as_page)
    }

    /// Mutable access to a fully fetched page
    pub fn page_mut(&mut self, key: &str) -> Option<&mut Page> {
        let slot = self.slot_for(key)?;
        self.slots[slot].as_page_mut()
    }

    /// Returns the most complete reference reachable from any of `keys`
    pub fn lookup_any<'a, I>(&self, keys: I) -> Option<&PageReference>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<&PageReference> = None;
        for reference in keys.into_iter().filter_map(|key| self.get(key)) {
            if best.map_or(true, |b| reference.status() > b.status()) {
                best = Some(reference);
            }
        }
        best
    }

    /// Resolves a key to a stable page id, using the alias map first
    pub fn resolve_id(&self, key: &str) -> Option<String> {
        if let Some(id) = self
            .alias_to_id
            .get(key)
            .or_else(|| self.alias_to_id.get(&key.to_lowercase()))
        {
            return Some(id.clone());
        }
        self.get(key)
            .and_then(PageReference::page_id)
            .map(ToString::to_string)
    }

    /// Slots a downloaded revision into its owner's history
    ///
    /// Returns false when the owner isn't a fully fetched page.
    pub fn attach_revision(&mut self, owner_key: &str, revision: Page) -> bool {
        let Some(owner) = self.page_mut(owner_key) else {
            return false;
        };
        let edit = revision.edit_number();
        if edit == 0 {
            return false;
        }

        let position = (edit - 1) as usize;
        while owner.history.len() <= position {
            let next = owner.history.len() as u32 + 1;
            owner
                .history
                .push(PageReference::KeyOnly(owner.identity().at_edit(Some(next))));
        }
        owner.history[position] = revision.into();
        true
    }

    /// Every fully fetched page, once each, in registration order
    pub fn pages(&self) -> impl Iterator<Item = &Page> + '_ {
        self.slots.iter().enumerate().filter_map(move |(slot, reference)| {
            let page = reference.as_page()?;
            (self.keys.get(page.page_id()) == Some(&slot)).then_some(page)
        })
    }

    /// Every reference still held by at least one key, once each, in
    /// registration order
    pub fn references(&self) -> impl Iterator<Item = &PageReference> + '_ {
        let live: BTreeSet<usize> = self.keys.values().copied().collect();
        live.into_iter().map(move |slot| &self.slots[slot])
    }

    /// Number of distinct fully fetched pages
    pub fn page_count(&self) -> usize {
        self.pages().count()
    }

    /// Number of keys in the index
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Sorted view of every key with the status of its reference
    pub fn snapshot(&self) -> BTreeMap<&str, (String, crate::page::ReferenceStatus)> {
        self.keys
            .iter()
            .map(|(key, &slot)| {
                let reference = &self.slots[slot];
                (
                    key.as_str(),
                    (reference.alias_or_id().to_string(), reference.status()),
                )
            })
            .collect()
    }

    pub fn alias_to_id(&self) -> &BTreeMap<String, String> {
        &self.alias_to_id
    }

    fn slot_for(&self, key: &str) -> Option<usize> {
        self.keys
            .get(key)
            .or_else(|| self.keys.get(&key.to_lowercase()))
            .copied()
    }
}

/// Keys a reference is indexed under
fn index_keys(reference: &PageReference) -> Vec<String> {
    let identity = reference.identity();
    let mut keys: Vec<String> = identity.keys().into_iter().map(str::to_string).collect();
    for key in [identity.page_id.as_deref(), identity.alias.as_deref()]
        .into_iter()
        .flatten()
    {
        keys.push(key.to_lowercase());
    }
    if let Some(title) = reference.title() {
        keys.push(title.to_string());
    }
    keys.sort();
    keys.dedup();
    keys
}
