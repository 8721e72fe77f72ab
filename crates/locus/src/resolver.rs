//! Self-healing locator resolution.
//!
//! For each `(key, description)` the resolver tries the cached selector
//! first. When there is none, or it no longer matches the live page, it
//! reduces the page, asks the inference backend for exactly one
//! candidate, validates that candidate on the page and writes it back.
//!
//! ```text
//! CacheLookup ──hit──▶ ValidateCached ──found──▶ Resolved (no write)
//!      │                     │
//!     miss                 stale
//!      ▼                     ▼
//!   Fallback ◀───────────────┘
//!      │ NOT_FOUND ──▶ Failed(NotFound)
//!      │ backend error ──▶ Failed(InferenceUnavailable)
//!      ▼
//! ValidateCandidate ──found──▶ save + Resolved
//!      └──absent──▶ Failed(Hallucinated)
//! ```

use crate::config::ResolverConfig;
use crate::dom::DomReducer;
use crate::events::{default_sink, EventSink, LocatorEvent};
use crate::inference::{LlmSelectorInference, SelectorInference};
use crate::page::{LivePage, WaitState};
use crate::result::{LocusError, LocusResult};
use crate::store::LocatorStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a resolved selector came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Cached selector validated on the page
    Cache,
    /// Inferred, validated and written back
    Inferred {
        /// Cached selector that failed validation, if there was one
        stale: Option<String>,
    },
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Logical key
    pub key: String,
    /// Validated selector
    pub selector: String,
    /// How it was obtained
    pub source: ResolutionSource,
}

impl Resolution {
    /// True when the cache answered without inference
    #[must_use]
    pub const fn from_cache(&self) -> bool {
        matches!(self.source, ResolutionSource::Cache)
    }

    /// True when a stale cached selector was replaced
    #[must_use]
    pub const fn healed(&self) -> bool {
        matches!(self.source, ResolutionSource::Inferred { stale: Some(_) })
    }
}

/// Resolves logical element keys to selectors valid on a live page
pub struct LocatorResolver {
    page: Arc<dyn LivePage>,
    inference: Arc<dyn SelectorInference>,
    store: LocatorStore,
    config: ResolverConfig,
    reducer: DomReducer,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for LocatorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatorResolver")
            .field("suite", &self.store.suite())
            .field("inference", &self.inference)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocatorResolver {
    /// Create a resolver from its parts with default settings
    #[must_use]
    pub fn new(
        page: Arc<dyn LivePage>,
        inference: Arc<dyn SelectorInference>,
        store: LocatorStore,
    ) -> Self {
        let config = ResolverConfig::default();
        Self {
            page,
            inference,
            store,
            reducer: DomReducer::new(config.reducer),
            config,
            events: default_sink(),
        }
    }

    /// Open the suite's store and build the HTTP inference client from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Fails with [`LocusError::MissingCredential`] when no API key is
    /// configured.
    pub fn open(page: Arc<dyn LivePage>, suite: &str, config: ResolverConfig) -> LocusResult<Self> {
        Self::open_with_events(page, suite, config, default_sink())
    }

    /// [`LocatorResolver::open`] with every event, including those raised
    /// while loading the store, sent to `events`.
    ///
    /// # Errors
    ///
    /// Same as [`LocatorResolver::open`].
    pub fn open_with_events(
        page: Arc<dyn LivePage>,
        suite: &str,
        config: ResolverConfig,
        events: Arc<dyn EventSink>,
    ) -> LocusResult<Self> {
        config.validate()?;
        let inference = LlmSelectorInference::new(&config.inference)?;
        let store = LocatorStore::open(&config.cache_dir, suite, events.clone());
        Ok(Self::new(page, Arc::new(inference), store)
            .with_config(config)
            .with_events(events))
    }

    /// Replace the settings
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.reducer = DomReducer::new(config.reducer);
        self.config = config;
        self
    }

    /// Send resolution and store events to `events`
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.store.set_events(events.clone());
        self.events = events;
        self
    }

    /// Resolve `key` to a selector that currently matches the page.
    ///
    /// # Errors
    ///
    /// [`LocusError::InvalidKey`] for an empty key,
    /// [`LocusError::Snapshot`] when the page markup cannot be read, and
    /// [`LocusError::NotFound`], [`LocusError::Hallucinated`] or
    /// [`LocusError::InferenceUnavailable`] when fallback inference fails.
    pub async fn resolve(&mut self, key: &str, description: &str) -> LocusResult<String> {
        self.resolve_detailed(key, description)
            .await
            .map(|resolution| resolution.selector)
    }

    /// Like [`LocatorResolver::resolve`] but reports how the selector was
    /// obtained.
    ///
    /// # Errors
    ///
    /// Same as [`LocatorResolver::resolve`].
    pub async fn resolve_detailed(&mut self, key: &str, description: &str) -> LocusResult<Resolution> {
        if key.is_empty() {
            return Err(LocusError::InvalidKey);
        }

        let stale = match self.store.get(key).map(str::to_string) {
            Some(cached) => {
                let (state, timeout) = (self.config.cached_state, self.config.cached_timeout());
                if self.probe(&cached, state, timeout).await {
                    self.events.emit(LocatorEvent::CacheHit {
                        key: key.to_string(),
                        selector: cached.clone(),
                    });
                    return Ok(Resolution {
                        key: key.to_string(),
                        selector: cached,
                        source: ResolutionSource::Cache,
                    });
                }
                self.events.emit(LocatorEvent::CacheStale {
                    key: key.to_string(),
                    selector: cached.clone(),
                });
                Some(cached)
            }
            None => {
                self.events.emit(LocatorEvent::CacheMiss {
                    key: key.to_string(),
                });
                None
            }
        };

        let selector = self.infer(key, description).await?;
        self.store.save(key, &selector, description);
        self.events.emit(LocatorEvent::Healed {
            key: key.to_string(),
            selector: selector.clone(),
        });
        Ok(Resolution {
            key: key.to_string(),
            selector,
            source: ResolutionSource::Inferred { stale },
        })
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &LocatorStore {
        &self.store
    }

    /// Suite identity
    #[must_use]
    pub fn suite(&self) -> &str {
        self.store.suite()
    }

    /// Current settings
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Snapshot, one inference call, candidate validation.
    async fn infer(&self, key: &str, description: &str) -> LocusResult<String> {
        let markup = self.page.content().await.map_err(|err| match err {
            LocusError::Snapshot { .. } => err,
            other => LocusError::Snapshot {
                message: other.to_string(),
            },
        })?;
        let snapshot = self.reducer.reduce(&markup);
        self.events.emit(LocatorEvent::InferenceRequested {
            key: key.to_string(),
            snapshot_len: snapshot.len(),
        });

        let candidate = match self.inference.find_selector(&snapshot, description).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                self.events.emit(LocatorEvent::InferenceNoMatch {
                    key: key.to_string(),
                });
                return Err(LocusError::NotFound {
                    key: key.to_string(),
                    description: description.to_string(),
                });
            }
            Err(err) => {
                self.events.emit(LocatorEvent::InferenceFailed {
                    key: key.to_string(),
                    error: err.to_string(),
                });
                return Err(LocusError::InferenceUnavailable {
                    key: key.to_string(),
                    description: description.to_string(),
                    message: err.to_string(),
                });
            }
        };

        let (state, timeout) = (self.config.candidate_state, self.config.candidate_timeout());
        if !self.probe(&candidate, state, timeout).await {
            self.events.emit(LocatorEvent::Hallucinated {
                key: key.to_string(),
                selector: candidate.clone(),
            });
            return Err(LocusError::Hallucinated {
                key: key.to_string(),
                description: description.to_string(),
                selector: candidate,
            });
        }
        Ok(candidate)
    }

    /// Page lookup where a failing page counts as "not found"
    async fn probe(&self, selector: &str, state: WaitState, timeout: Duration) -> bool {
        match self.page.wait_for(selector, state, timeout).await {
            Ok(found) => found,
            Err(err) => {
                self.events.emit(LocatorEvent::PageLookupFailed {
                    selector: selector.to_string(),
                    error: err.to_string(),
                });
                false
            }
        }
    }
}
