//! Persisted crawl metadata
//!
//! One JSON document carrying the alias -> id map and the failure map
//! between runs.

use crate::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata document saved next to the raw payload cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetadata {
    #[serde(default)]
    pub alias_to_id: BTreeMap<String, String>,

    #[serde(default)]
    pub failures: FailureMap,

    /// Hash of the configuration used by the run that saved this document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Kind of a recorded fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    HttpStatus,
    Timeout,
    CacheOnly,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::Timeout => "timeout",
            Self::CacheOnly => "cache_only",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl FetchFailure {
    /// True for failures caused by a real fetch attempt
    pub fn is_real(&self) -> bool {
        self.kind != FailureKind::CacheOnly
    }
}

impl From<&FetchError> for FetchFailure {
    fn from(error: &FetchError) -> Self {
        let (kind, status) = match error {
            FetchError::Network { .. } => (FailureKind::Network, None),
            FetchError::HttpStatus { status, .. } => (FailureKind::HttpStatus, Some(*status)),
            FetchError::Timeout { .. } => (FailureKind::Timeout, None),
            FetchError::CacheOnly { .. } => (FailureKind::CacheOnly, None),
        };
        Self {
            kind,
            message: error.to_string(),
            status,
        }
    }
}

/// Failures of one page: its current edit and any historical edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<FetchFailure>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edits: BTreeMap<u32, FetchFailure>,
}

impl PageFailures {
    fn slot(&self, edit: Option<u32>) -> Option<&FetchFailure> {
        match edit {
            None => self.current.as_ref(),
            Some(edit) => self.edits.get(&edit),
        }
    }

    fn is_empty(&self) -> bool {
        self.current.is_none() && self.edits.is_empty()
    }
}

/// Fetch failures keyed by page identity
///
/// Starts each run as the previous run's map. Successes clear entries, and
/// a cache-only failure never replaces a failure from a real fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureMap {
    entries: BTreeMap<String, PageFailures>,
}

impl FailureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `identity` at `edit`
    ///
    /// Returns false when an existing real failure was kept in place of a
    /// cache-only one.
    pub fn record(&mut self, identity: &str, edit: Option<u32>, failure: FetchFailure) -> bool {
        let entry = self.entries.entry(identity.to_string()).or_default();
        if !failure.is_real() && entry.slot(edit).is_some_and(FetchFailure::is_real) {
            return false;
        }
        match edit {
            None => entry.current = Some(failure),
            Some(edit) => {
                entry.edits.insert(edit, failure);
            }
        }
        true
    }

    /// Forgets the failure for `identity` at `edit`, if any
    pub fn clear(&mut self, identity: &str, edit: Option<u32>) {
        if let Some(entry) = self.entries.get_mut(identity) {
            match edit {
                None => entry.current = None,
                Some(edit) => {
                    entry.edits.remove(&edit);
                }
            }
            if entry.is_empty() {
                self.entries.remove(identity);
            }
        }
    }

    /// Records a failure for a page known under several keys
    ///
    /// `keys[0]` is the identity the failure is stored under. Entries the
    /// other keys hold at `edit` are folded into it first, so one page never
    /// carries two failures for the same edit.
    pub fn record_merged(&mut self, keys: &[&str], edit: Option<u32>, failure: FetchFailure) -> bool {
        let Some((primary, others)) = keys.split_first() else {
            return false;
        };
        for key in others.iter().filter(|key| *key != primary) {
            if let Some(previous) = self.get(key, edit).cloned() {
                self.clear(key, edit);
                self.record(primary, edit, previous);
            }
        }
        self.record(primary, edit, failure)
    }

    /// Forgets the failures recorded at `edit` under any of `keys`
    pub fn clear_all<'a, I>(&mut self, keys: I, edit: Option<u32>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.clear(key, edit);
        }
    }

    /// The first real failure carried over under any of `keys`
    pub fn blocking_any<'a, I>(&self, keys: I, edit: Option<u32>) -> Option<&FetchFailure>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().find_map(|key| self.blocking(key, edit))
    }

    pub fn get(&self, identity: &str, edit: Option<u32>) -> Option<&FetchFailure> {
        self.entries.get(identity)?.slot(edit)
    }

    /// A real failure carried over for `identity` at `edit`
    pub fn blocking(&self, identity: &str, edit: Option<u32>) -> Option<&FetchFailure> {
        self.get(identity, edit).filter(|failure| failure.is_real())
    }

    /// Every failure as `(identity, edit, failure)`, sorted by identity
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u32>, &FetchFailure)> + '_ {
        self.entries.iter().flat_map(|(identity, failures)| {
            let current = failures
                .current
                .iter()
                .map(move |failure| (identity.as_str(), None, failure));
            let edits = failures
                .edits
                .iter()
                .map(move |(edit, failure)| (identity.as_str(), Some(*edit), failure));
            current.chain(edits)
        })
    }

    /// Number of failed fetches
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct identities with at least one failure
    pub fn identity_count(&self) -> usize {
        self.entries.len()
    }
}
