//! `tracing` subscriber setup for the CLI

use crate::config::CliConfig;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins over the verbosity flags. Calling this twice is a
/// no-op.
pub fn init(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = CliConfig::default();
        init(&config);
        init(&config);
        tracing::info!(target: "locus", "subscriber installed");
    }
}
