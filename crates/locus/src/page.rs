//! Live page abstraction.
//!
//! The resolver only needs two things from a browser session: the current
//! markup and a bounded "does this selector match" probe. [`StaticPage`]
//! answers both from a fixed markup string; the CDP-backed page lives in
//! [`crate::browser`] behind the `browser` feature.

use crate::dom::{Document, Element, SelectorList};
use crate::result::LocusResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Element state a lookup waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    /// At least one matching element is in the DOM
    #[default]
    Attached,
    /// At least one matching element is rendered and not hidden
    Visible,
}

impl WaitState {
    /// Name used in logs and page probes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
        }
    }
}

impl std::fmt::Display for WaitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page the resolver can inspect but never modifies
#[async_trait]
pub trait LivePage: Send + Sync {
    /// Full markup of the current document
    async fn content(&self) -> LocusResult<String>;

    /// Wait up to `timeout` for `selector` to match an element in `state`.
    ///
    /// Returns `Ok(false)` when the timeout expires; errors are reserved for
    /// a broken page or session.
    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> LocusResult<bool>;
}

/// One recorded [`LivePage::wait_for`] call on a [`StaticPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Selector probed
    pub selector: String,
    /// Requested state
    pub state: WaitState,
    /// Requested timeout
    pub timeout: Duration,
    /// Answer given
    pub found: bool,
}

/// In-memory page over fixed markup.
///
/// Lookups answer immediately (the markup never changes, so waiting would
/// not change the outcome). Selectors outside the supported CSS subset
/// never match.
#[derive(Debug)]
pub struct StaticPage {
    markup: Mutex<String>,
    lookups: Mutex<Vec<Lookup>>,
    snapshots: AtomicUsize,
}

impl StaticPage {
    /// Create a page serving `markup`
    #[must_use]
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: Mutex::new(markup.into()),
            lookups: Mutex::new(Vec::new()),
            snapshots: AtomicUsize::new(0),
        }
    }

    /// Replace the markup, as if the application re-rendered
    pub fn set_markup(&self, markup: impl Into<String>) {
        match self.markup.lock() {
            Ok(mut guard) => *guard = markup.into(),
            Err(poisoned) => *poisoned.into_inner() = markup.into(),
        }
    }

    /// Current markup
    #[must_use]
    pub fn markup(&self) -> String {
        match self.markup.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All lookups made so far
    #[must_use]
    pub fn lookups(&self) -> Vec<Lookup> {
        match self.lookups.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of times [`LivePage::content`] was called
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    /// Synchronous match check used by `wait_for`
    #[must_use]
    pub fn matches(&self, selector: &str, state: WaitState) -> bool {
        let Ok(selector) = SelectorList::parse(selector) else {
            return false;
        };
        let document = Document::parse(&self.markup());
        document.any_element(|el, ancestors| {
            selector.matches(el, ancestors)
                && (state == WaitState::Attached
                    || (is_rendered(el) && ancestors.iter().all(|a| is_rendered(a))))
        })
    }

    fn record(&self, lookup: Lookup) {
        match self.lookups.lock() {
            Ok(mut guard) => guard.push(lookup),
            Err(poisoned) => poisoned.into_inner().push(lookup),
        }
    }
}

fn is_rendered(element: &Element) -> bool {
    if element.has_attr("hidden") {
        return false;
    }
    if element.name == "input" && element.attr("type") == Some("hidden") {
        return false;
    }
    let style: String = element
        .attr("style")
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    !(style.contains("display:none") || style.contains("visibility:hidden"))
}

#[async_trait]
impl LivePage for StaticPage {
    async fn content(&self) -> LocusResult<String> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(self.markup())
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> LocusResult<bool> {
        let found = self.matches(selector, state);
        self.record(Lookup {
            selector: selector.to_string(),
            state,
            timeout,
            found,
        });
        Ok(found)
    }
}
