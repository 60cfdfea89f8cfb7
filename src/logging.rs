//! Diagnostic logging.
//!
//! Logs go to stderr so they never interleave with the chat transcript on
//! stdout. `RUST_LOG` wins over the `--log-level` default.

use tracing_subscriber::EnvFilter;

pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
