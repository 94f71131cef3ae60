//! Persistent product cache
//!
//! Maps scan codes to previously resolved products. The whole cache is one JSON
//! object on disk and is re-read for every scan, so edits made through the
//! correction UI are visible to the next scan without any shared in-memory
//! state. Two concurrent writers can lose an update; scans are serialized
//! through the scan channel and corrections are rare, so that window is
//! accepted. Revisit before reusing this for anything high-throughput.

use chrono::{DateTime, Utc};
use slm_common::{ProductRecord, ScanCode};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cache persistence errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed snapshot, or one with fields this version does not know
    #[error("cache file {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// In-memory snapshot of the cache
///
/// Keys are kept sorted so saved files diff cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCache {
    products: BTreeMap<ScanCode, ProductRecord>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match lookup
    pub fn lookup(&self, code: &ScanCode) -> Option<&ProductRecord> {
        self.products.get(code)
    }

    /// Insert or replace the record for a code, returning the previous one
    pub fn upsert(&mut self, code: ScanCode, record: ProductRecord) -> Option<ProductRecord> {
        self.products.insert(code, record)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScanCode, &ProductRecord)> {
        self.products.iter()
    }

    /// Records sorted by last scan, newest first; never-scanned records last
    pub fn recently_scanned(&self) -> Vec<(&ScanCode, &ProductRecord)> {
        let mut entries: Vec<_> = self.products.iter().collect();
        entries.sort_by(|(_, a), (_, b)| newest_first(a.last_scanned, b.last_scanned));
        entries
    }

    /// Like [`Self::recently_scanned`], keeping only one exact category
    pub fn recently_scanned_in(&self, category: &str) -> Vec<(&ScanCode, &ProductRecord)> {
        self.recently_scanned()
            .into_iter()
            .filter(|(_, record)| record.product_category == category)
            .collect()
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> std::cmp::Ordering {
    // None < Some, so the reversed comparison puts never-scanned records last
    b.cmp(&a)
}

impl FromIterator<(ScanCode, ProductRecord)> for ProductCache {
    fn from_iter<I: IntoIterator<Item = (ScanCode, ProductRecord)>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().collect(),
        }
    }
}

/// Whole-file JSON snapshot store
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; a missing file is an empty cache
    pub fn load(&self) -> Result<ProductCache, CacheError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Cache file missing, starting empty");
                return Ok(ProductCache::new());
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let products = serde_json::from_str(&content).map_err(|source| CacheError::Invalid {
            path: self.path.clone(),
            source,
        })?;

        Ok(ProductCache { products })
    }

    /// Write the snapshot to a sibling temp file and rename it into place
    pub fn save(&self, cache: &ProductCache) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(&cache.products).map_err(CacheError::Serialize)?;

        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), products = cache.len(), "Cache saved");
        Ok(())
    }
}
