//! Reference discovery
//!
//! Extracts the references a fetched payload points at:
//! - sibling page objects embedded in the payload's `pages` collection
//! - scalar values under id-shaped keys anywhere in the JSON tree
//! - earlier edits of the page itself, when history tracking is on

use crate::config::DiscoveryConfig;
use crate::page::{scalar_string, Page, PageReference};
use serde_json::Value;
use std::collections::HashSet;

/// Which JSON keys hold page ids
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRules {
    id_list_fields: Vec<String>,
    denylist: Vec<String>,
}

impl DiscoveryRules {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            id_list_fields: config.id_list_fields.clone(),
            denylist: config.denylist.clone(),
        }
    }

    /// True for keys whose scalar values are page ids
    ///
    /// The bare `id` key is never followed: it sits on many unrelated
    /// sub-objects such as change log entries.
    pub fn is_id_key(&self, key: &str) -> bool {
        if key == "id" || self.denylist.iter().any(|denied| denied == key) {
            return false;
        }
        key.ends_with("Id")
            || key.ends_with("Ids")
            || self.id_list_fields.iter().any(|field| field == key)
    }
}

/// References found in one payload
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    /// Embedded page objects, as partial references
    pub siblings: Vec<PageReference>,
    /// Bare ids found under id-shaped keys
    pub keys: Vec<PageReference>,
    /// One reference per earlier edit of the page
    pub history: Vec<PageReference>,
}

/// Discovers the references in `page`'s payload
///
/// # Arguments
///
/// * `page` - A freshly fetched or loaded page
/// * `rules` - Id-shaped key rules
/// * `include_history` - Whether to emit references to earlier edits
///   (never for a revision)
pub fn discover_references(page: &Page, rules: &DiscoveryRules, include_history: bool) -> Discovered {
    let siblings = page
        .payload
        .get("pages")
        .and_then(Value::as_object)
        .map(|pages| {
            pages
                .values()
                .filter_map(|value| PageReference::from_json(value, None))
                .filter(|reference| reference.page_id() != Some(page.page_id()))
                .collect()
        })
        .unwrap_or_default();

    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    collect_ids(&page.payload, rules, &mut seen, &mut ids);
    let keys = ids
        .iter()
        .filter_map(|id| PageReference::from_key(id, None))
        .collect();

    let history = if include_history && !page.is_revision() {
        (1..page.edit)
            .map(|edit| PageReference::KeyOnly(page.identity().at_edit(Some(edit))))
            .collect()
    } else {
        Vec::new()
    };

    Discovered {
        siblings,
        keys,
        history,
    }
}

fn collect_ids(value: &Value, rules: &DiscoveryRules, seen: &mut HashSet<String>, ids: &mut Vec<String>) {
    match value {
        Value::Object(object) => {
            for (key, child) in object {
                if rules.is_id_key(key) {
                    collect_scalars(child, seen, ids);
                }
                collect_ids(child, rules, seen, ids);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, rules, seen, ids);
            }
        }
        _ => {}
    }
}

fn collect_scalars(value: &Value, seen: &mut HashSet<String>, ids: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_scalars(item, seen, ids);
            }
        }
        scalar => {
            if let Some(id) = scalar_string(scalar) {
                let id = id.trim().to_string();
                if !id.is_empty() && id != "0" && seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> DiscoveryRules {
        DiscoveryRules::new(&DiscoveryConfig::default())
    }

    fn page(payload: Value, edit_requested: Option<u32>) -> Page {
        Page::from_payload(payload, "abc", edit_requested, 30).unwrap()
    }

    fn key_names(references: &[PageReference]) -> Vec<&str> {
        references.iter().map(PageReference::alias_or_id).collect()
    }

    #[test]
    fn test_is_id_key() {
        let rules = rules();
        assert!(rules.is_id_key("pageId"));
        assert!(rules.is_id_key("childIds"));
        assert!(rules.is_id_key("individualLikes"));
        assert!(!rules.is_id_key("id"));
        assert!(!rules.is_id_key("analyticsId"));
        assert!(!rules.is_id_key("title"));
        assert!(!rules.is_id_key("Identity"));
    }

    #[test]
    fn test_generic_id_field_is_excluded() {
        let payload = json!({"pages": {"abc": {"pageId": "abc", "changeLogs": [{"id": 42, "pageId": "abc"}]}}});
        let found = discover_references(&page(payload, None), &rules(), false);
        assert!(!key_names(&found.keys).contains(&"42"));
    }

    #[test]
    fn test_scalars_under_id_keys() {
        let payload = json!({
            "pages": {"abc": {
                "pageId": "abc",
                "parentIds": ["p1", "p2"],
                "individualLikes": [7, "0", ""],
                "analyticsId": "UA-1",
                "nested": {"editCreatorId": "u9", "title": "not an id"}
            }}
        });
        let found = discover_references(&page(payload, None), &rules(), false);
        let mut names = key_names(&found.keys);
        names.sort();
        assert_eq!(names, vec!["7", "abc", "p1", "p2", "u9"]);
    }

    #[test]
    fn test_siblings_are_partial_references() {
        let payload = json!({"pages": {
            "abc": {"pageId": "abc"},
            "def": {"pageId": "def", "alias": "d_alias", "title": "D"},
            "nothing": {"title": "no identity"}
        }});
        let found = discover_references(&page(payload, None), &rules(), false);
        assert_eq!(key_names(&found.siblings), vec!["d_alias"]);
        assert!(found.siblings.iter().all(|r| !r.is_full()));
    }

    #[test]
    fn test_history_references() {
        let payload = json!({"pages": {"abc": {"pageId": "abc", "edit": 4}}});
        let current = page(payload.clone(), None);

        let found = discover_references(&current, &rules(), true);
        let edits: Vec<_> = found.history.iter().map(PageReference::requested_edit).collect();
        assert_eq!(edits, vec![Some(1), Some(2), Some(3)]);

        assert!(discover_references(&current, &rules(), false).history.is_empty());
        assert!(discover_references(&page(payload, Some(2)), &rules(), true).history.is_empty());
    }
}
