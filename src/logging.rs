//! Diagnostics go to stderr so stdout stays clean for reports

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over the `--debug` default.
pub(crate) fn init_logging(debug: bool, use_color: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_ansi(use_color);

    // A second init (tests) is not an error worth surfacing
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
