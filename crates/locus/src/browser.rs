//! Chromium-backed live pages over the Chrome `DevTools` Protocol.
//!
//! Only compiled with the `browser` feature.

use crate::page::{LivePage, WaitState};
use crate::result::{LocusError, LocusResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default interval between selector probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Interval between selector probes on opened pages
    pub poll_interval: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set the selector probe interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Browser instance with a live CDP connection
#[derive(Debug)]
pub struct Browser {
    config: BrowserConfig,
    inner: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch a new browser instance
    ///
    /// # Errors
    ///
    /// Returns error if browser cannot be launched
    pub async fn launch(config: BrowserConfig) -> LocusResult<Self> {
        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| LocusError::BrowserLaunch { message })?;
        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            LocusError::BrowserLaunch {
                message: e.to_string(),
            }
        })?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Open `url` in a new tab and wait for it to load
    ///
    /// # Errors
    ///
    /// Returns error if the tab cannot be created or navigation fails
    pub async fn new_page(&self, url: &str) -> LocusResult<CdpPage> {
        let browser = self.inner.lock().await;
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| LocusError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| LocusError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(CdpPage::new(page).with_poll_interval(self.config.poll_interval))
    }

    /// Get the browser configuration
    #[must_use]
    pub const fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if the browser process does not shut down cleanly
    pub async fn close(self) -> LocusResult<()> {
        let mut browser = self.inner.lock().await;
        browser
            .close()
            .await
            .map_err(|e| LocusError::BrowserLaunch {
                message: e.to_string(),
            })?;
        self.handle.abort();
        Ok(())
    }
}

/// [`LivePage`] over a CDP page
#[derive(Debug, Clone)]
pub struct CdpPage {
    page: Page,
    poll_interval: Duration,
}

impl CdpPage {
    /// Wrap an open page
    #[must_use]
    pub const fn new(page: Page) -> Self {
        Self {
            page,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the interval between selector probes
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Underlying CDP page
    #[must_use]
    pub const fn inner(&self) -> &Page {
        &self.page
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, expr: String) -> LocusResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| LocusError::Page {
                message: e.to_string(),
            })?;
        result.into_value().map_err(|e| LocusError::Page {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl LivePage for CdpPage {
    async fn content(&self) -> LocusResult<String> {
        self.evaluate("document.documentElement.outerHTML".to_string())
            .await
            .map_err(|e| LocusError::Snapshot {
                message: e.to_string(),
            })
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> LocusResult<bool> {
        let probe = probe_script(selector, state)?;
        let deadline = Instant::now() + timeout;
        loop {
            if self.evaluate::<bool>(probe.clone()).await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Script answering whether `selector` matches in `state`.
///
/// Selectors the browser rejects evaluate to `false`.
fn probe_script(selector: &str, state: WaitState) -> LocusResult<String> {
    let selector = serde_json::to_string(selector)?;
    let visible_only = state == WaitState::Visible;
    Ok(format!(
        "(() => {{\n\
           try {{\n\
             const els = document.querySelectorAll({selector});\n\
             if (!{visible_only}) return els.length > 0;\n\
             for (const el of els) {{\n\
               const style = window.getComputedStyle(el);\n\
               if (style.visibility !== 'hidden' && style.display !== 'none' && el.getClientRects().length > 0) return true;\n\
             }}\n\
             return false;\n\
           }} catch (e) {{\n\
             return false;\n\
           }}\n\
         }})()"
    ))
}
