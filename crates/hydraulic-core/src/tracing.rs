//! Logging setup shared by hydraulic monitor binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with the `info` default filter.
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
///
/// `RUST_LOG`, when set, takes precedence over `default_filter`.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .init();
}
