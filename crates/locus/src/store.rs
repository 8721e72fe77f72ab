//! Persistent locator store.
//!
//! One JSON document per suite identity, mapping logical keys to the last
//! selector that was validated on a live page:
//!
//! ```json
//! {
//!   "login-button": {
//!     "selector": "#go",
//!     "description": "Sign in button",
//!     "lastUpdated": "2026-01-01T12:00:00Z"
//!   }
//! }
//! ```
//!
//! Loading and persistence never fail the caller. A broken file starts an
//! empty document; a failed write leaves the in-memory copy current. Both
//! are reported through the event sink.

use crate::events::{EventSink, LocatorEvent};
use crate::result::LocusResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FILE_EXTENSION: &str = "json";

/// Cached selector for one logical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorRecord {
    /// CSS selector last validated on a live page
    pub selector: String,
    /// Human description used to infer it
    pub description: String,
    /// When the record was written
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Key to record mapping for one suite
pub type StoreDocument = BTreeMap<String, LocatorRecord>;

/// File-backed cache of selectors for one suite
#[derive(Debug)]
pub struct LocatorStore {
    suite: String,
    path: PathBuf,
    records: StoreDocument,
    events: Arc<dyn EventSink>,
}

impl LocatorStore {
    /// Open the document for `suite` under `dir`.
    ///
    /// A missing file yields an empty store. An unreadable or malformed
    /// file also yields an empty store and emits
    /// [`LocatorEvent::StoreCorrupt`].
    pub fn open(dir: impl AsRef<Path>, suite: &str, events: Arc<dyn EventSink>) -> Self {
        let path = dir
            .as_ref()
            .join(format!("{}.{FILE_EXTENSION}", sanitize_suite_name(suite)));
        let records = match load_document(&path) {
            Ok(Some(records)) => {
                events.emit(LocatorEvent::StoreLoaded {
                    suite: suite.to_string(),
                    path: path.clone(),
                    entries: records.len(),
                });
                records
            }
            Ok(None) => StoreDocument::new(),
            Err(err) => {
                events.emit(LocatorEvent::StoreCorrupt {
                    path: path.clone(),
                    error: err.to_string(),
                });
                StoreDocument::new()
            }
        };
        Self {
            suite: suite.to_string(),
            path,
            records,
            events,
        }
    }

    /// Cached selector for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(|r| r.selector.as_str())
    }

    /// Full record for `key`
    #[must_use]
    pub fn record(&self, key: &str) -> Option<&LocatorRecord> {
        self.records.get(key)
    }

    /// All records in key order
    pub fn records(&self) -> impl Iterator<Item = (&str, &LocatorRecord)> {
        self.records.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Insert or overwrite `key` and persist the whole document
    pub fn save(&mut self, key: &str, selector: &str, description: &str) {
        self.records.insert(
            key.to_string(),
            LocatorRecord {
                selector: selector.to_string(),
                description: description.to_string(),
                last_updated: Utc::now(),
            },
        );
        self.persist(key);
    }

    /// Remove `key`; persists only when something was removed
    pub fn remove(&mut self, key: &str) -> Option<LocatorRecord> {
        let removed = self.records.remove(key);
        if removed.is_some() {
            self.persist(key);
        }
        removed
    }

    /// Drop every record and persist the empty document
    pub fn clear(&mut self) {
        self.records.clear();
        self.persist("*");
    }

    /// Like [`LocatorStore::remove`] but returns the write failure.
    ///
    /// # Errors
    ///
    /// Returns the I/O or serialization error when the document could not
    /// be written. The record is already gone from memory at that point.
    pub fn try_remove(&mut self, key: &str) -> LocusResult<Option<LocatorRecord>> {
        let removed = self.records.remove(key);
        if removed.is_some() {
            self.try_persist(key)?;
        }
        Ok(removed)
    }

    /// Like [`LocatorStore::clear`] but returns the write failure.
    /// Yields the number of records dropped.
    ///
    /// # Errors
    ///
    /// Returns the I/O or serialization error when the empty document
    /// could not be written.
    pub fn try_clear(&mut self) -> LocusResult<usize> {
        let removed = self.records.len();
        self.records.clear();
        self.try_persist("*")?;
        Ok(removed)
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redirect load and persistence events
    pub fn set_events(&mut self, events: Arc<dyn EventSink>) {
        self.events = events;
    }

    /// Suite identity as given to [`LocatorStore::open`]
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    fn persist(&self, key: &str) {
        // failure already reported through the sink
        let _ = self.try_persist(key);
    }

    fn try_persist(&self, key: &str) -> LocusResult<()> {
        match write_document(&self.path, &self.records) {
            Ok(()) => {
                self.events.emit(LocatorEvent::StoreSaved {
                    path: self.path.clone(),
                    key: key.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                self.events.emit(LocatorEvent::StoreWriteFailed {
                    path: self.path.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// File-system safe form of a suite identity.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`; an empty identity maps
/// to `default`.
#[must_use]
pub fn sanitize_suite_name(suite: &str) -> String {
    if suite.is_empty() {
        return "default".to_string();
    }
    suite
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Suite documents found in `dir`, sorted by name.
///
/// Returns the file stem of every `*.json` file. A missing directory has
/// no suites.
pub fn list_suites(dir: impl AsRef<Path>) -> LocusResult<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut suites = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            suites.push(stem.to_string());
        }
    }
    suites.sort();
    Ok(suites)
}

fn load_document(path: &Path) -> LocusResult<Option<StoreDocument>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn write_document(path: &Path, records: &StoreDocument) -> LocusResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
