//! Logging initialization for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `verbosity`: 0 = INFO, 1 = DEBUG, 2+ = TRACE. Debug mode raises the
/// floor to DEBUG so resolution decisions are visible. With `json`, events
/// are written to stderr as JSON lines:
///
/// ```json
/// {"timestamp":"...","level":"WARN","fields":{"message":"deprecated framework import","specifier":"ondemand-react"},"span":{"name":"load","path":"/p/src/App.tsx"}}
/// ```
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init(verbosity: u8, json: bool, debug: bool) {
    let level = match (verbosity, debug) {
        (0, false) => Level::INFO,
        (0 | 1, _) => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG sets the baseline; our own crates follow the flags.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(format!("ondemand_core={level}").parse().unwrap())
        .add_directive(format!("ondemand={level}").parse().unwrap());

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
