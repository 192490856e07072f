//! Tracing subscriber setup for binaries and tests that host the library.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! the host's call. [`init_tracing`] is a convenience for the common case.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `filter` uses `EnvFilter` syntax (e.g. `"info,store=debug"`); `RUST_LOG`
/// takes precedence when set. With `json`, events are emitted as JSON lines.
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(filter: &str, json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(env_filter).with_target(true);
    let result = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    result.is_ok()
}
