//! Locus CLI library
//!
//! Command-line interface for the Locus locator cache and resolver.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    CacheArgs, CacheDirArgs, CacheForgetArgs, CacheShowArgs, CacheSubcommand, CacheSuiteArgs, Cli,
    ColorArg, Commands, ReduceArgs, ResolveArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
