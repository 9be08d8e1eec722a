//! Page identities and references
//!
//! A [`PageReference`] names a page that may or may not have been fetched
//! yet. The three variants form an ordered completeness scale which drives
//! every merge decision in the page index.

use crate::page::Page;
use serde_json::Value;
use std::fmt;

/// How much is known about a referenced page
///
/// The ordering is the merge tie-break: `KeyOnly < PartialReference < FullPage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceStatus {
    /// Only a lookup key (id or alias) is known
    KeyOnly,

    /// A partial JSON object carrying at least an id or an alias
    PartialReference,

    /// The page payload was fetched or loaded from cache
    FullPage,
}

impl ReferenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyOnly => "key_only",
            Self::PartialReference => "partial_reference",
            Self::FullPage => "full_page",
        }
    }
}

impl fmt::Display for ReferenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity shared by every reference variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PageIdentity {
    pub page_id: Option<String>,
    pub alias: Option<String>,
    pub lookup_key: Option<String>,
    /// Historical edit number, `None` meaning the current edit
    pub requested_edit: Option<u32>,
}

impl PageIdentity {
    /// Creates an identity, treating empty and `"0"` ids as absent
    pub fn new(
        page_id: Option<&str>,
        alias: Option<&str>,
        lookup_key: Option<&str>,
        requested_edit: Option<u32>,
    ) -> Self {
        Self {
            page_id: non_empty(page_id).filter(|id| id != "0"),
            alias: non_empty(alias),
            lookup_key: non_empty(lookup_key),
            requested_edit,
        }
    }

    /// Alias if present, else id, else the originally supplied lookup key
    pub fn alias_or_id(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.page_id.as_deref())
            .or(self.lookup_key.as_deref())
            .unwrap_or("")
    }

    /// Distinct non-empty values among id, alias and lookup key
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(3);
        for key in [
            self.page_id.as_deref(),
            self.alias.as_deref(),
            self.lookup_key.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Returns the same identity pointing at a specific edit
    pub fn at_edit(&self, edit: Option<u32>) -> Self {
        Self {
            requested_edit: edit,
            ..self.clone()
        }
    }

    pub fn has_keys(&self) -> bool {
        self.page_id.is_some() || self.alias.is_some() || self.lookup_key.is_some()
    }
}

impl fmt::Display for PageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.requested_edit {
            Some(edit) => write!(f, "{}@{}", self.alias_or_id(), edit),
            None => write!(f, "{}", self.alias_or_id()),
        }
    }
}

/// A page object embedded in some other page's payload
#[derive(Debug, Clone, PartialEq)]
pub struct PartialPage {
    pub identity: PageIdentity,
    pub title: Option<String>,
    pub page_type: Option<String>,
    pub json: Value,
}

/// A reference to a page at some level of completeness
#[derive(Debug, Clone)]
pub enum PageReference {
    KeyOnly(PageIdentity),
    Partial(PartialPage),
    Full(Box<Page>),
}

impl PageReference {
    /// Builds a key-only reference from a bare lookup key
    ///
    /// Returns `None` for an empty key, so every reference has at least one key.
    pub fn from_key(key: &str, edit: Option<u32>) -> Option<Self> {
        let identity = PageIdentity::new(None, None, Some(key.trim()), edit);
        identity.has_keys().then_some(Self::KeyOnly(identity))
    }

    /// Builds a partial reference from a JSON object carrying an id or alias
    ///
    /// Returns `None` when the object has neither a usable `pageId` nor `alias`.
    pub fn from_json(value: &Value, edit: Option<u32>) -> Option<Self> {
        let object = value.as_object()?;
        let page_id = object.get("pageId").and_then(scalar_string);
        let alias = object.get("alias").and_then(scalar_string);
        let identity = PageIdentity::new(page_id.as_deref(), alias.as_deref(), None, edit);
        if identity.page_id.is_none() && identity.alias.is_none() {
            return None;
        }

        Some(Self::Partial(PartialPage {
            identity,
            title: object
                .get("title")
                .and_then(Value::as_str)
                .and_then(|t| non_empty(Some(t))),
            page_type: object
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| non_empty(Some(t))),
            json: value.clone(),
        }))
    }

    pub fn identity(&self) -> &PageIdentity {
        match self {
            Self::KeyOnly(identity) => identity,
            Self::Partial(partial) => &partial.identity,
            Self::Full(page) => page.identity(),
        }
    }

    pub fn status(&self) -> ReferenceStatus {
        match self {
            Self::KeyOnly(_) => ReferenceStatus::KeyOnly,
            Self::Partial(_) => ReferenceStatus::PartialReference,
            Self::Full(_) => ReferenceStatus::FullPage,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        self.identity().keys()
    }

    pub fn alias_or_id(&self) -> &str {
        self.identity().alias_or_id()
    }

    pub fn page_id(&self) -> Option<&str> {
        self.identity().page_id.as_deref()
    }

    pub fn requested_edit(&self) -> Option<u32> {
        self.identity().requested_edit
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::KeyOnly(_) => None,
            Self::Partial(partial) => partial.title.as_deref(),
            Self::Full(page) => Some(page.title.as_str()).filter(|t| !t.is_empty()),
        }
    }

    /// Page type (`wiki`, `comment`, ...) when known
    pub fn page_type(&self) -> Option<&str> {
        match self {
            Self::KeyOnly(_) => None,
            Self::Partial(partial) => partial.page_type.as_deref(),
            Self::Full(page) => Some(page.page_type.as_str()).filter(|t| !t.is_empty()),
        }
    }

    /// Best available human-readable name
    pub fn name(&self) -> &str {
        match self {
            Self::Full(page) => page.display_name(),
            _ => self.title().unwrap_or_else(|| self.alias_or_id()),
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Full(page) => Some(page.as_ref()),
            _ => None,
        }
    }

    pub fn as_page_mut(&mut self) -> Option<&mut Page> {
        match self {
            Self::Full(page) => Some(page.as_mut()),
            _ => None,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

impl From<Page> for PageReference {
    fn from(page: Page) -> Self {
        Self::Full(Box::new(page))
    }
}

/// Returns the most complete reference among `first` and `others`
///
/// Absent candidates are ignored; among equally complete candidates the
/// first one wins.
pub fn pick_best<'a, I>(first: &'a PageReference, others: I) -> &'a PageReference
where
    I: IntoIterator<Item = Option<&'a PageReference>>,
{
    let mut best = first;
    for candidate in others.into_iter().flatten() {
        if candidate.status() > best.status() {
            best = candidate;
        }
    }
    best
}

/// Renders a JSON scalar (string or number) as an id string
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_ordering() {
        assert!(ReferenceStatus::KeyOnly < ReferenceStatus::PartialReference);
        assert!(ReferenceStatus::PartialReference < ReferenceStatus::FullPage);
    }

    #[test]
    fn test_from_key() {
        let reference = PageReference::from_key("front_page", None).unwrap();
        assert_eq!(reference.status(), ReferenceStatus::KeyOnly);
        assert_eq!(reference.alias_or_id(), "front_page");
        assert_eq!(reference.keys(), vec!["front_page"]);

        assert!(PageReference::from_key("", None).is_none());
        assert!(PageReference::from_key("   ", Some(2)).is_none());
    }

    #[test]
    fn test_from_json() {
        let value = json!({"pageId": "1ab", "alias": "bayes_rule", "title": "Bayes' rule", "type": "wiki"});
        let reference = PageReference::from_json(&value, None).unwrap();

        assert_eq!(reference.status(), ReferenceStatus::PartialReference);
        assert_eq!(reference.alias_or_id(), "bayes_rule");
        assert_eq!(reference.keys(), vec!["1ab", "bayes_rule"]);
        assert_eq!(reference.title(), Some("Bayes' rule"));
        assert_eq!(reference.page_type(), Some("wiki"));
        assert_eq!(reference.name(), "Bayes' rule");
    }

    #[test]
    fn test_from_json_requires_id_or_alias() {
        assert!(PageReference::from_json(&json!({"title": "No identity"}), None).is_none());
        assert!(PageReference::from_json(&json!({"pageId": "0", "alias": ""}), None).is_none());
        assert!(PageReference::from_json(&json!("1ab"), None).is_none());
    }

    #[test]
    fn test_alias_or_id_fallbacks() {
        let id_only = PageIdentity::new(Some("42"), None, Some("lookup"), None);
        assert_eq!(id_only.alias_or_id(), "42");

        let key_only = PageIdentity::new(None, None, Some("lookup"), None);
        assert_eq!(key_only.alias_or_id(), "lookup");
    }

    #[test]
    fn test_keys_are_distinct() {
        let identity = PageIdentity::new(Some("abc"), Some("abc"), Some("abc"), None);
        assert_eq!(identity.keys(), vec!["abc"]);
    }

    #[test]
    fn test_identity_display() {
        let identity = PageIdentity::new(Some("1ab"), None, None, Some(3));
        assert_eq!(identity.to_string(), "1ab@3");
        assert_eq!(identity.at_edit(None).to_string(), "1ab");
    }

    #[test]
    fn test_pick_best_prefers_higher_status() {
        let key = PageReference::from_key("a", None).unwrap();
        let partial = PageReference::from_json(&json!({"pageId": "a"}), None).unwrap();

        assert_eq!(
            pick_best(&key, [Some(&partial)]).status(),
            ReferenceStatus::PartialReference
        );
        assert_eq!(
            pick_best(&partial, [Some(&key)]).status(),
            ReferenceStatus::PartialReference
        );
    }

    #[test]
    fn test_pick_best_ignores_absent_and_is_idempotent() {
        let key = PageReference::from_key("a", None).unwrap();
        let best = pick_best(&key, [None, Some(&key), None]);
        assert!(std::ptr::eq(best, &key));
    }

    #[test]
    fn test_pick_best_tie_keeps_first() {
        let first = PageReference::from_key("a", None).unwrap();
        let second = PageReference::from_key("b", None).unwrap();
        let best = pick_best(&first, [Some(&second)]);
        assert_eq!(best.alias_or_id(), "a");
    }
}
