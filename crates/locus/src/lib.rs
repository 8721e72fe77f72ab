//! Locus: self-healing element locators for browser tests.
//!
//! Tests refer to elements by a stable logical key plus a plain-language
//! description. Locus keeps the last working CSS selector for every key in
//! a per-suite JSON cache and re-validates it on the live page. When the
//! cached selector is missing or stale it reduces the page to an
//! identifying skeleton, asks a language model for a new selector,
//! validates the answer and writes it back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      LocatorResolver                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ LocatorStore │   │  DomReducer  │   │ SelectorInference│  │
//! │  │ (JSON file)  │   │ (owned tree) │   │ (chat completion)│  │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘  │
//! │           ▲                 ▲                               │
//! │           └──── LivePage (StaticPage │ CdpPage) ────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use locus::{LocatorResolver, LocatorStore, ScriptedInference, StaticPage, TracingSink};
//! use std::sync::Arc;
//!
//! # async fn demo() -> locus::LocusResult<()> {
//! let page = Arc::new(StaticPage::new(r#"<button id="go">Go</button>"#));
//! let inference = Arc::new(ScriptedInference::new().then_selector("#go"));
//! let store = LocatorStore::open("locator-cache", "demo", Arc::new(TracingSink));
//! let mut resolver = LocatorResolver::new(page, inference, store);
//! let selector = resolver.resolve("go-btn", "The Go button").await?;
//! assert_eq!(selector, "#go");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
pub mod browser;
pub mod config;
pub mod dom;
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod inference;
pub mod page;
mod resolver;
mod result;
pub mod store;

#[cfg(feature = "browser")]
pub use browser::{Browser, BrowserConfig, CdpPage};
pub use config::{InferenceConfig, ResolverConfig};
pub use dom::{DomReducer, ReducerOptions};
pub use events::{EventSink, LocatorEvent, NullSink, RecordingSink, Severity, TracingSink};
pub use inference::{
    clean_response, InferenceError, LlmSelectorInference, ScriptedInference, SelectorInference,
};
pub use page::{LivePage, StaticPage, WaitState};
pub use resolver::{LocatorResolver, Resolution, ResolutionSource};
pub use result::{LocusError, LocusResult};
pub use store::{LocatorRecord, LocatorStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        DomReducer, EventSink, InferenceConfig, LivePage, LocatorResolver, LocatorStore,
        LocusError, LocusResult, ResolverConfig, ScriptedInference, SelectorInference,
        StaticPage, WaitState,
    };
    #[cfg(feature = "browser")]
    pub use super::{Browser, BrowserConfig, CdpPage};
}
