//! Handler for `locus resolve`.

use crate::commands::ResolveArgs;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use locus::{LivePage, LocatorResolver, Resolution, ResolutionSource, ResolverConfig, StaticPage};
use std::sync::Arc;

/// Configuration file if given, else defaults; env overrides either way
pub fn load_config(args: &ResolveArgs) -> CliResult<ResolverConfig> {
    let config = match &args.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::from_env(),
    };
    let config = match &args.dir {
        Some(dir) => config.with_cache_dir(dir),
        None => config,
    };
    tracing::debug!(cache_dir = %config.cache_dir.display(), model = %config.inference.model, "resolver configuration");
    Ok(config)
}

/// Run one resolution on `page`
pub async fn resolve_on(
    page: Arc<dyn LivePage>,
    args: &ResolveArgs,
    config: ResolverConfig,
) -> CliResult<Resolution> {
    let mut resolver = LocatorResolver::open(page, &args.suite, config)?;
    Ok(resolver.resolve_detailed(&args.key, &args.description).await?)
}

/// One-line description of how a selector was obtained
#[must_use]
pub fn describe(resolution: &Resolution) -> String {
    match &resolution.source {
        ResolutionSource::Cache => format!("'{}' resolved from cache", resolution.key),
        ResolutionSource::Inferred { stale: Some(old) } => {
            format!("'{}' healed (was {old})", resolution.key)
        }
        ResolutionSource::Inferred { stale: None } => {
            format!("'{}' inferred and cached", resolution.key)
        }
    }
}

async fn resolve_html(args: &ResolveArgs, config: ResolverConfig) -> CliResult<Resolution> {
    let Some(path) = &args.html else {
        return Err(CliError::invalid_argument("--html or --url is required"));
    };
    let markup = std::fs::read_to_string(path)
        .map_err(|e| CliError::invalid_argument(format!("cannot read {}: {e}", path.display())))?;
    resolve_on(Arc::new(StaticPage::new(markup)), args, config).await
}

#[cfg(feature = "browser")]
async fn resolve_url(url: &str, args: &ResolveArgs, config: ResolverConfig) -> CliResult<Resolution> {
    use locus::{Browser, BrowserConfig};
    use std::time::Duration;

    let mut browser_config =
        BrowserConfig::default().with_poll_interval(Duration::from_millis(config.poll_interval_ms));
    if args.no_sandbox {
        browser_config = browser_config.with_no_sandbox();
    }
    let browser = Browser::launch(browser_config).await?;
    let result = match browser.new_page(url).await {
        Ok(page) => resolve_on(Arc::new(page), args, config).await,
        Err(err) => Err(err.into()),
    };
    browser.close().await?;
    result
}

#[cfg(not(feature = "browser"))]
async fn resolve_url(_url: &str, _args: &ResolveArgs, _config: ResolverConfig) -> CliResult<Resolution> {
    Err(CliError::FeatureDisabled { feature: "browser" })
}

/// Execute the resolve command
pub async fn execute_resolve(args: &ResolveArgs, printer: &Printer) -> CliResult<()> {
    let config = load_config(args)?;
    let resolution = match &args.url {
        Some(url) => resolve_url(url, args, config).await?,
        None => resolve_html(args, config).await?,
    };
    printer.info(&describe(&resolution));
    println!("{}", resolution.selector);
    Ok(())
}
