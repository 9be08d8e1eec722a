//! Filesystem payload store
//!
//! Layout under the cache directory:
//!
//! ```text
//! metadata.json
//! pages/<id>.json
//! history/<id>/<edit>.json
//! ```
//!
//! Ids are percent-encoded (everything outside `[A-Za-z0-9_-]`), which keeps
//! the mapping injective and reversible on every filesystem.

use crate::cache::traits::{CacheError, CacheResult, PageStore};
use crate::cache::CrawlMetadata;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes escaped in file names
const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

const METADATA_FILE: &str = "metadata.json";
const PAGES_DIR: &str = "pages";
const HISTORY_DIR: &str = "history";

/// Maps page ids and edits to cache paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the payload for `page_id` at `edit` (`None` = current)
    pub fn locate(&self, page_id: &str, edit: Option<u32>) -> PathBuf {
        match edit {
            None => self
                .root
                .join(PAGES_DIR)
                .join(format!("{}.json", encode_key(page_id))),
            Some(edit) => self
                .root
                .join(HISTORY_DIR)
                .join(encode_key(page_id))
                .join(format!("{}.json", edit)),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn pages_dir(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }
}

/// Encodes a page id as a file name component
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

/// Reverses [`encode_key`]
pub fn decode_key(encoded: &str) -> CacheResult<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| CacheError::InvalidKey(encoded.to_string()))
}

/// Filesystem-backed payload store
#[derive(Debug, Clone)]
pub struct FsStore {
    layout: CacheLayout,
}

impl FsStore {
    /// Creates a store rooted at `root`
    ///
    /// Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: CacheLayout::new(root),
        }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    fn read_json(path: &Path) -> CacheResult<Value> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(value)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Decoded stems of the `.json` files directly inside `dir`
    fn json_stems(dir: &Path) -> CacheResult<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut stems = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }
}

impl PageStore for FsStore {
    fn contains(&self, page_id: &str, edit: Option<u32>) -> bool {
        self.layout.locate(page_id, edit).is_file()
    }

    fn load_raw(&self, page_id: &str, edit: Option<u32>) -> CacheResult<Option<Value>> {
        let path = self.layout.locate(page_id, edit);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_json(&path).map(Some)
    }

    fn persist_raw(&self, page_id: &str, edit: Option<u32>, payload: &Value) -> CacheResult<()> {
        Self::write_json(&self.layout.locate(page_id, edit), payload)
    }

    fn list_current(&self) -> CacheResult<Vec<String>> {
        let mut ids = Self::json_stems(&self.layout.pages_dir())?
            .iter()
            .map(|stem| decode_key(stem))
            .collect::<CacheResult<Vec<_>>>()?;
        ids.sort();
        Ok(ids)
    }

    fn list_history(&self) -> CacheResult<Vec<(String, u32)>> {
        let history_dir = self.layout.history_dir();
        if !history_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut revisions = Vec::new();
        for entry in fs::read_dir(&history_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let page_id = decode_key(name)?;
            for stem in Self::json_stems(&path)? {
                if let Ok(edit) = stem.parse::<u32>() {
                    revisions.push((page_id.clone(), edit));
                }
            }
        }
        revisions.sort();
        Ok(revisions)
    }

    fn load_metadata(&self) -> CacheResult<CrawlMetadata> {
        let path = self.layout.metadata_path();
        if !path.is_file() {
            return Ok(CrawlMetadata::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    fn save_metadata(&self, metadata: &CrawlMetadata) -> CacheResult<()> {
        Self::write_json(&self.layout.metadata_path(), metadata)
    }
}
