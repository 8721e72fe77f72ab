//! Locus CLI: inspect locator caches, reduce pages and resolve selectors
//!
//! ## Usage
//!
//! ```bash
//! locus cache list                                  # Suites and entry counts
//! locus cache show login --json                     # One suite's records
//! locus reduce page.html                            # What the model would see
//! locus resolve --suite login --key go-btn \
//!     --description "Go button" --html page.html    # Full resolution
//! ```

use clap::Parser;
use locus_cli::{handlers, logging, Cli, CliConfig, CliError, CliResult, Commands, Printer, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());

    match run(cli, &config, &printer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            printer.failure(&format!("Error: {e}"));
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
}

fn run(cli: Cli, config: &CliConfig, printer: &Printer) -> CliResult<()> {
    console::set_colors_enabled(config.color.should_color());
    console::set_colors_enabled_stderr(config.color.should_color());
    logging::init(config);

    match cli.command {
        Commands::Cache(args) => handlers::execute_cache(&args, printer),
        Commands::Reduce(args) => handlers::execute_reduce(&args),
        Commands::Resolve(args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| CliError::config(format!("Failed to create async runtime: {e}")))?;
            rt.block_on(handlers::execute_resolve(&args, printer))
        }
    }
}
