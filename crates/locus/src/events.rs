//! Resolution events and the sinks that receive them.
//!
//! Components never log through a global logger. Each one holds an
//! [`EventSink`] handed in at construction: [`TracingSink`] forwards to
//! `tracing`, [`NullSink`] drops everything and [`RecordingSink`] keeps
//! events in memory so tests can assert on them.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Severity attached to each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Routine progress
    Debug,
    /// Notable but expected
    Info,
    /// Degraded behavior, resolution continues
    Warn,
    /// Something failed
    Error,
}

/// Something that happened inside the store or the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorEvent {
    /// A cache document was read from disk
    StoreLoaded {
        /// Suite identity
        suite: String,
        /// Backing file
        path: PathBuf,
        /// Number of records loaded
        entries: usize,
    },
    /// A cache document existed but could not be read or parsed
    StoreCorrupt {
        /// Backing file
        path: PathBuf,
        /// Parse or read error
        error: String,
    },
    /// The document was written to disk
    StoreSaved {
        /// Backing file
        path: PathBuf,
        /// Key that triggered the write
        key: String,
    },
    /// Writing the document failed; the in-memory copy is still current
    StoreWriteFailed {
        /// Backing file
        path: PathBuf,
        /// I/O or serialization error
        error: String,
    },
    /// Cached selector validated on the live page
    CacheHit {
        /// Logical key
        key: String,
        /// Cached selector
        selector: String,
    },
    /// Cached selector no longer matches the page
    CacheStale {
        /// Logical key
        key: String,
        /// Cached selector
        selector: String,
    },
    /// No cached selector for the key
    CacheMiss {
        /// Logical key
        key: String,
    },
    /// Fallback inference is about to run
    InferenceRequested {
        /// Logical key
        key: String,
        /// Length of the reduced snapshot in bytes
        snapshot_len: usize,
    },
    /// The model reported no matching element
    InferenceNoMatch {
        /// Logical key
        key: String,
    },
    /// The inference backend call failed
    InferenceFailed {
        /// Logical key
        key: String,
        /// Backend error
        error: String,
    },
    /// A candidate was validated and written back
    Healed {
        /// Logical key
        key: String,
        /// New selector
        selector: String,
    },
    /// The candidate did not match the live page
    Hallucinated {
        /// Logical key
        key: String,
        /// Rejected selector
        selector: String,
    },
    /// The page lookup primitive itself failed
    PageLookupFailed {
        /// Selector being looked up
        selector: String,
        /// Page error
        error: String,
    },
}

impl LocatorEvent {
    /// Severity of this event
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::CacheHit { .. } | Self::InferenceRequested { .. } | Self::StoreSaved { .. } => {
                Severity::Debug
            }
            Self::StoreLoaded { .. } | Self::CacheMiss { .. } | Self::Healed { .. } => {
                Severity::Info
            }
            Self::StoreCorrupt { .. }
            | Self::CacheStale { .. }
            | Self::InferenceNoMatch { .. }
            | Self::Hallucinated { .. }
            | Self::PageLookupFailed { .. } => Severity::Warn,
            Self::StoreWriteFailed { .. } | Self::InferenceFailed { .. } => Severity::Error,
        }
    }

    /// Logical key the event refers to, if any
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::StoreSaved { key, .. }
            | Self::CacheHit { key, .. }
            | Self::CacheStale { key, .. }
            | Self::CacheMiss { key }
            | Self::InferenceRequested { key, .. }
            | Self::InferenceNoMatch { key }
            | Self::InferenceFailed { key, .. }
            | Self::Healed { key, .. }
            | Self::Hallucinated { key, .. } => Some(key),
            Self::StoreLoaded { .. }
            | Self::StoreCorrupt { .. }
            | Self::StoreWriteFailed { .. }
            | Self::PageLookupFailed { .. } => None,
        }
    }
}

impl fmt::Display for LocatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreLoaded {
                suite,
                path,
                entries,
            } => write!(
                f,
                "loaded {entries} cached locators for suite '{suite}' from {}",
                path.display()
            ),
            Self::StoreCorrupt { path, error } => write!(
                f,
                "ignoring unreadable locator cache {}: {error}",
                path.display()
            ),
            Self::StoreSaved { path, key } => {
                write!(f, "saved locator '{key}' to {}", path.display())
            }
            Self::StoreWriteFailed { path, error } => write!(
                f,
                "failed to write locator cache {}: {error}",
                path.display()
            ),
            Self::CacheHit { key, selector } => {
                write!(f, "cache hit for '{key}': {selector}")
            }
            Self::CacheStale { key, selector } => write!(
                f,
                "cached selector for '{key}' is stale ({selector}), self-healing"
            ),
            Self::CacheMiss { key } => write!(f, "no cached selector for '{key}', asking AI"),
            Self::InferenceRequested { key, snapshot_len } => write!(
                f,
                "requesting selector for '{key}' from a {snapshot_len} byte snapshot"
            ),
            Self::InferenceNoMatch { key } => {
                write!(f, "AI reported no matching element for '{key}'")
            }
            Self::InferenceFailed { key, error } => {
                write!(f, "inference failed for '{key}': {error}")
            }
            Self::Healed { key, selector } => write!(f, "healed '{key}' -> {selector}"),
            Self::Hallucinated { key, selector } => write!(
                f,
                "AI selector for '{key}' matches nothing on the page: {selector}"
            ),
            Self::PageLookupFailed { selector, error } => {
                write!(f, "page lookup for {selector} failed: {error}")
            }
        }
    }
}

/// Receiver for locator events
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Handle one event
    fn emit(&self, event: LocatorEvent);
}

/// Forwards events to `tracing` at their severity
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LocatorEvent) {
        let key = event.key().unwrap_or("-");
        match event.severity() {
            Severity::Debug => tracing::debug!(target: "locus", key, "{event}"),
            Severity::Info => tracing::info!(target: "locus", key, "{event}"),
            Severity::Warn => tracing::warn!(target: "locus", key, "{event}"),
            Severity::Error => tracing::error!(target: "locus", key, "{event}"),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LocatorEvent) {}
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LocatorEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared recording sink
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of all recorded events, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<LocatorEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Count events matching a predicate
    pub fn count(&self, predicate: impl Fn(&LocatorEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// Whether any recorded event matches a predicate
    pub fn any(&self, predicate: impl Fn(&LocatorEvent) -> bool) -> bool {
        self.count(predicate) > 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LocatorEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Default sink used when none is injected
#[must_use]
pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}
