//! Tracing subscriber setup for the command-line tool.

use tracing_subscriber::EnvFilter;

/// Maps `-v` occurrences to the crate's log level.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "seed=warn",
        1 => "seed=debug",
        _ => "seed=trace",
    }
}

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
