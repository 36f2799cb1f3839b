//! Process-wide tracing subscriber.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Debug mode prints human-readable lines from DEBUG up. Otherwise only
/// errors are emitted, as JSON. `RUST_LOG` overrides either level.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if debug {
        builder.with_target(false).try_init()
    } else {
        builder.json().with_current_span(false).try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
