//! Fully fetched pages
//!
//! A [`Page`] is built once from a fetched (or cached) JSON payload and never
//! changes afterwards, except for its lazily computed presentation fields and
//! the in-place upgrade of its revision history slots.

use crate::page::reference::{scalar_string, PageIdentity, PageReference};
use crate::page::PageIndex;
use crate::render::{diff_against_history, PageDiff, RenderedText, TextRenderer};
use crate::MirrorError;
use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use std::cell::OnceCell;

/// Maximum ancestor chain length followed when building breadcrumbs
const MAX_BREADCRUMB_DEPTH: usize = 16;

/// One step of a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    /// Link target (alias or id)
    pub key: String,
    /// Display name of the ancestor
    pub name: String,
}

/// A fully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    identity: PageIdentity,
    pub title: String,
    pub text: String,
    /// Short promotional blurb
    pub clickbait: String,
    pub page_type: String,
    pub child_ids: Vec<String>,
    pub parent_ids: Vec<String>,
    pub creator_id: Option<String>,
    pub creator_ids: Vec<String>,
    pub tag_ids: Vec<String>,
    pub liker_ids: Vec<String>,
    pub related_ids: Vec<String>,
    pub comment_ids: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
    pub edited_at: Option<NaiveDateTime>,
    /// Current edit number reported by the payload
    pub edit: u32,
    /// The whole payload as fetched, sibling pages included
    pub payload: Value,
    /// True when the payload came from the on-disk cache
    pub cached: bool,
    /// Slot `n - 1` references edit `n`, for every edit before the current one
    pub history: Vec<PageReference>,
    display_name: String,
    rendered: OnceCell<RenderedText>,
    summary: OnceCell<String>,
    diff: OnceCell<PageDiff>,
    breadcrumbs: OnceCell<Vec<Vec<Crumb>>>,
}

impl Page {
    /// Builds a page from a raw payload
    ///
    /// The primary page object is located in the payload's `pages` collection
    /// by id or alias (case-insensitively), falling back to
    /// `result.primaryPageId`.
    ///
    /// # Arguments
    ///
    /// * `payload` - The raw JSON document as fetched
    /// * `requested_key` - Id or alias the payload was requested for
    /// * `requested_edit` - Historical edit number, `None` for the current edit
    /// * `name_max_length` - Truncation length for derived display names
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The page
    /// * `Err(MirrorError::DataShape)` - The payload doesn't contain the page
    pub fn from_payload(
        payload: Value,
        requested_key: &str,
        requested_edit: Option<u32>,
        name_max_length: usize,
    ) -> Result<Self, MirrorError> {
        let object = find_primary_object(&payload, requested_key)
            .ok_or_else(|| {
                MirrorError::DataShape(format!(
                    "payload for '{}' contains no matching page",
                    requested_key
                ))
            })?
            .clone();

        let page_id = object.get("pageId").and_then(scalar_string);
        let alias = object.get("alias").and_then(scalar_string);
        let identity = PageIdentity::new(
            page_id.as_deref(),
            alias.as_deref(),
            Some(requested_key),
            requested_edit,
        );
        if identity.page_id.is_none() {
            return Err(MirrorError::DataShape(format!(
                "page '{}' has no pageId",
                requested_key
            )));
        }

        let edit = object
            .get("edit")
            .and_then(number_field)
            .or(requested_edit)
            .unwrap_or(0);

        let title = string_field(&object, "title");
        let text = string_field(&object, "text");
        let clickbait = string_field(&object, "clickbait");

        let display_name = [
            title.clone(),
            truncate(&clickbait, name_max_length),
            truncate(&text, name_max_length),
        ]
        .into_iter()
        .find(|candidate| !candidate.trim().is_empty())
        .unwrap_or_else(|| identity.alias_or_id().to_string());

        // Only the current edit carries placeholders for its predecessors
        let history = if requested_edit.is_none() {
            (1..edit)
                .map(|n| PageReference::KeyOnly(identity.at_edit(Some(n))))
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            title,
            text,
            clickbait,
            page_type: string_field(&object, "type"),
            child_ids: id_list(&object, "childIds"),
            parent_ids: id_list(&object, "parentIds"),
            creator_id: object
                .get("pageCreatorId")
                .and_then(scalar_string)
                .filter(|id| !id.is_empty() && id != "0"),
            creator_ids: id_list(&object, "creatorIds"),
            tag_ids: id_list(&object, "tagIds"),
            liker_ids: id_list(&object, "individualLikes"),
            related_ids: id_list(&object, "relatedIds"),
            comment_ids: id_list(&object, "commentIds"),
            created_at: object.get("pageCreatedAt").and_then(timestamp_field),
            edited_at: object.get("editCreatedAt").and_then(timestamp_field),
            edit,
            payload,
            cached: false,
            history,
            display_name,
            identity,
            rendered: OnceCell::new(),
            summary: OnceCell::new(),
            diff: OnceCell::new(),
            breadcrumbs: OnceCell::new(),
        })
    }

    pub fn identity(&self) -> &PageIdentity {
        &self.identity
    }

    pub fn page_id(&self) -> &str {
        self.identity.page_id.as_deref().unwrap_or("")
    }

    pub fn alias_or_id(&self) -> &str {
        self.identity.alias_or_id()
    }

    /// Edit number this page represents (the requested one for revisions)
    pub fn edit_number(&self) -> u32 {
        self.identity.requested_edit.unwrap_or(self.edit)
    }

    pub fn is_revision(&self) -> bool {
        self.identity.requested_edit.is_some()
    }

    /// First non-empty of title, truncated blurb, truncated text and alias/id
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// False for anonymous boilerplate pages whose alias is just their id
    ///
    /// Ids listed in `namelike_page_ids` look like anonymous ids but are
    /// real names.
    pub fn is_named(&self, namelike_page_ids: &[String]) -> bool {
        let alias = self.alias_or_id();
        if namelike_page_ids.iter().any(|id| id == alias) {
            return true;
        }
        let starts_with_letter = alias.chars().next().is_some_and(char::is_alphabetic);
        alias != self.page_id() || starts_with_letter
    }

    /// Public URL of the page on the source site
    pub fn canonical_url(&self, domain: &str) -> String {
        format!("https://{}/p/{}/", domain, self.alias_or_id())
    }

    /// Keeps the raw payload flagged as coming from the cache
    pub fn mark_cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Rendered body text, computed on first access
    pub fn rendered(&self, renderer: &TextRenderer, index: &PageIndex) -> &RenderedText {
        self.rendered
            .get_or_init(|| renderer.render(&self.text, index))
    }

    /// Rendered short summary: the blurb if any, else the truncated text
    pub fn summary(
        &self,
        renderer: &TextRenderer,
        index: &PageIndex,
        max_length: usize,
    ) -> &str {
        self.summary.get_or_init(|| {
            let source = if self.clickbait.trim().is_empty() {
                truncate(&self.text, max_length)
            } else {
                self.clickbait.clone()
            };
            renderer.render(&source, index).html
        })
    }

    /// Diff against the nearest downloaded prior revision, computed on first access
    ///
    /// `history` is the revision list of the page owning this edit: the page's
    /// own history for a current page, the owner's history for a revision.
    pub fn diff(&self, history: &[PageReference], edit_cost: usize) -> &PageDiff {
        self.diff
            .get_or_init(|| diff_against_history(self, history, edit_cost))
    }

    /// One ancestor trail per parent, root first
    pub fn breadcrumbs(&self, index: &PageIndex) -> &[Vec<Crumb>] {
        self.breadcrumbs.get_or_init(|| {
            self.parent_ids
                .iter()
                .map(|parent_id| ancestor_trail(self.page_id(), parent_id, index))
                .collect()
        })
    }
}

fn ancestor_trail(own_id: &str, parent_id: &str, index: &PageIndex) -> Vec<Crumb> {
    let mut trail = Vec::new();
    let mut seen = vec![own_id.to_string()];
    let mut current = parent_id.to_string();

    while trail.len() < MAX_BREADCRUMB_DEPTH && !seen.contains(&current) {
        seen.push(current.clone());
        match index.get(&current) {
            Some(reference) => {
                trail.push(Crumb {
                    key: reference.alias_or_id().to_string(),
                    name: reference.name().to_string(),
                });
                match reference
                    .as_page()
                    .and_then(|page| page.parent_ids.first())
                {
                    Some(next) => current = next.clone(),
                    None => break,
                }
            }
            None => {
                trail.push(Crumb {
                    key: current.clone(),
                    name: current.clone(),
                });
                break;
            }
        }
    }

    trail.reverse();
    trail
}

fn find_primary_object<'a>(payload: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    let pages = payload.get("pages")?.as_object()?;
    let lowered = key.to_lowercase();

    let matches_key = |object: &Map<String, Value>, field: &str| {
        object
            .get(field)
            .and_then(scalar_string)
            .is_some_and(|value| value == key || value.to_lowercase() == lowered)
    };

    pages
        .values()
        .filter_map(Value::as_object)
        .find(|object| matches_key(object, "pageId") || matches_key(object, "alias"))
        .or_else(|| {
            let primary = payload
                .get("result")
                .and_then(|result| result.get("primaryPageId"))
                .and_then(scalar_string)?;
            pages.get(&primary)?.as_object()
        })
}

fn string_field(object: &Map<String, Value>, field: &str) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_field(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_list(object: &Map<String, Value>, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(scalar_string)
                .filter(|id| !id.is_empty() && id != "0")
                .collect()
        })
        .unwrap_or_default()
}

fn timestamp_field(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

/// Cuts `text` to at most `max_length` characters, marking the cut with `...`
pub(crate) fn truncate(text: &str, max_length: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_length).collect();
    format!("{}...", cut.trim_end())
}
