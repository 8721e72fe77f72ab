//! Resolver and inference configuration.
//!
//! Values come from [`Default`], an optional YAML file and a handful of
//! environment variables, applied in that order.

use crate::dom::ReducerOptions;
use crate::page::WaitState;
use crate::result::{LocusError, LocusResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory for cache documents
pub const DEFAULT_CACHE_DIR: &str = "locator-cache";

/// Default timeout when re-validating a cached selector (2 seconds)
pub const DEFAULT_CACHED_TIMEOUT_MS: u64 = 2_000;

/// Default timeout when validating an inferred candidate (5 seconds)
pub const DEFAULT_CANDIDATE_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval for live-page lookups
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default timeout for one inference call (30 seconds)
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 30_000;

/// Environment variable overriding the cache directory
pub const ENV_CACHE_DIR: &str = "LOCUS_CACHE_DIR";
/// Environment variable holding the inference API key
pub const ENV_API_KEY: &str = "LOCUS_API_KEY";
/// Fallback environment variable for the API key
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the inference base URL
pub const ENV_BASE_URL: &str = "LOCUS_BASE_URL";
/// Environment variable overriding the model name
pub const ENV_MODEL: &str = "LOCUS_MODEL";

/// Settings for the text-generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of an OpenAI-compatible server
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer credential; required before an inference client can be built
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound for one completion call
    pub timeout_ms: u64,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens in the answer
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_ms: DEFAULT_INFERENCE_TIMEOUT_MS,
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

impl InferenceConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set call timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Call timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured API key, if it is non-blank
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).or_else(|| lookup(ENV_OPENAI_API_KEY)) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
    }
}

/// Settings for one resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory holding one JSON document per suite
    pub cache_dir: PathBuf,
    /// Timeout when re-validating a cached selector
    pub cached_timeout_ms: u64,
    /// Element state required of a cached selector
    pub cached_state: WaitState,
    /// Timeout when validating an inferred candidate
    pub candidate_timeout_ms: u64,
    /// Element state required of an inferred candidate
    pub candidate_state: WaitState,
    /// Polling interval for page lookups
    pub poll_interval_ms: u64,
    /// DOM reduction options
    pub reducer: ReducerOptions,
    /// Inference backend settings
    pub inference: InferenceConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cached_timeout_ms: DEFAULT_CACHED_TIMEOUT_MS,
            cached_state: WaitState::Attached,
            candidate_timeout_ms: DEFAULT_CANDIDATE_TIMEOUT_MS,
            candidate_state: WaitState::Visible,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reducer: ReducerOptions::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(&|name| std::env::var(name).ok());
        config
    }

    /// Load a YAML file, then apply environment overrides
    pub fn load(path: &Path) -> LocusResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LocusError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env(&|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse YAML without consulting the environment
    pub fn from_yaml(text: &str) -> LocusResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make resolution meaningless
    pub fn validate(&self) -> LocusResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(LocusError::Config {
                message: "poll_interval_ms must be greater than zero".into(),
            });
        }
        if self.inference.timeout_ms == 0 {
            return Err(LocusError::Config {
                message: "inference.timeout_ms must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Set cache directory
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set cached-selector timeout in milliseconds
    #[must_use]
    pub const fn with_cached_timeout(mut self, timeout_ms: u64) -> Self {
        self.cached_timeout_ms = timeout_ms;
        self
    }

    /// Set candidate timeout in milliseconds
    #[must_use]
    pub const fn with_candidate_timeout(mut self, timeout_ms: u64) -> Self {
        self.candidate_timeout_ms = timeout_ms;
        self
    }

    /// Set inference settings
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Set reducer options
    #[must_use]
    pub const fn with_reducer(mut self, reducer: ReducerOptions) -> Self {
        self.reducer = reducer;
        self
    }

    /// Cached-selector timeout as a [`Duration`]
    #[must_use]
    pub const fn cached_timeout(&self) -> Duration {
        Duration::from_millis(self.cached_timeout_ms)
    }

    /// Candidate timeout as a [`Duration`]
    #[must_use]
    pub const fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        self.inference.apply_env(lookup);
    }
}
