//! CLI command definitions using clap

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Locus: self-healing element locators for browser tests
#[derive(Parser, Debug)]
#[command(name = "locus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and maintain locator caches
    Cache(CacheArgs),

    /// Print the reduced snapshot of an HTML file
    Reduce(ReduceArgs),

    /// Resolve a logical key to a selector on a page
    Resolve(ResolveArgs),
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub subcommand: CacheSubcommand,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// List suites with their entry counts
    List(CacheDirArgs),

    /// Show the records of one suite
    Show(CacheShowArgs),

    /// Remove one record from a suite
    Forget(CacheForgetArgs),

    /// Remove every record from a suite
    Clear(CacheSuiteArgs),
}

/// Cache directory selection
#[derive(Parser, Debug, Clone)]
pub struct CacheDirArgs {
    /// Cache directory
    #[arg(long, env = "LOCUS_CACHE_DIR", default_value = "locator-cache")]
    pub dir: PathBuf,
}

/// Arguments naming one suite
#[derive(Parser, Debug)]
pub struct CacheSuiteArgs {
    /// Suite identity
    pub suite: String,

    #[command(flatten)]
    pub cache: CacheDirArgs,
}

/// Arguments for `cache show`
#[derive(Parser, Debug)]
pub struct CacheShowArgs {
    /// Suite identity
    pub suite: String,

    /// Print the raw JSON document
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub cache: CacheDirArgs,
}

/// Arguments for `cache forget`
#[derive(Parser, Debug)]
pub struct CacheForgetArgs {
    /// Suite identity
    pub suite: String,

    /// Logical key to remove
    pub key: String,

    #[command(flatten)]
    pub cache: CacheDirArgs,
}

/// Arguments for the reduce command
#[derive(Parser, Debug)]
pub struct ReduceArgs {
    /// HTML file to reduce
    pub file: PathBuf,

    /// Truncate text nodes longer than this many characters
    #[arg(long)]
    pub max_text: Option<usize>,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["html", "url"])))]
pub struct ResolveArgs {
    /// Suite identity (names the cache document)
    #[arg(long)]
    pub suite: String,

    /// Logical element key
    #[arg(long)]
    pub key: String,

    /// Plain-language description of the element
    #[arg(long)]
    pub description: String,

    /// Resolve against a static HTML file
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Resolve against a live page (requires the `browser` feature)
    #[arg(long)]
    pub url: Option<String>,

    /// YAML resolver configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Disable the browser sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cache_show() {
        let cli = Cli::try_parse_from(["locus", "cache", "show", "login", "--json", "--dir", "/tmp/c"]).unwrap();
        match cli.command {
            Commands::Cache(CacheArgs {
                subcommand: CacheSubcommand::Show(args),
            }) => {
                assert_eq!(args.suite, "login");
                assert!(args.json);
                assert_eq!(args.cache.dir, PathBuf::from("/tmp/c"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_reduce() {
        let cli = Cli::try_parse_from(["locus", "-vv", "reduce", "page.html", "--max-text", "40"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Reduce(args) => {
                assert_eq!(args.file, PathBuf::from("page.html"));
                assert_eq!(args.max_text, Some(40));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_resolve_requires_a_source() {
        let missing = Cli::try_parse_from([
            "locus", "resolve", "--suite", "s", "--key", "k", "--description", "d",
        ]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "locus", "resolve", "--suite", "s", "--key", "k", "--description", "d", "--html",
            "a.html", "--url", "http://x",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_parse_resolve_html() {
        let cli = Cli::try_parse_from([
            "locus", "resolve", "--suite", "s", "--key", "go-btn", "--description", "Go button",
            "--html", "page.html",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.key, "go-btn");
                assert_eq!(args.html, Some(PathBuf::from("page.html")));
                assert!(args.url.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
