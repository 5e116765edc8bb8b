// Logging setup on top of `tracing` / `tracing-subscriber`.
//
// RUST_LOG controls the filter, e.g. `RUST_LOG=oi_forecast=debug` to see
// per-source row statistics and rule decisions.
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Defaults to `info` when RUST_LOG is unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Verbose subscriber for tests; safe to call more than once.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
