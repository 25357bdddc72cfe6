//! Logging setup using tracing_subscriber.
//!
//! Events carry an upper-case `event` field naming what happened
//! (e.g. `HUB_BATCH_IMPORTED`). Output goes to stderr so stdout stays
//! reserved for JSON responses.

use std::{io::IsTerminal, sync::Once};

use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured filter
pub const LOG_ENV_VAR: &str = "ANNOTA_LOG";

/// Initializes the global subscriber. Later calls are no-ops.
pub fn init(default_filter: &str) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init();
    });
}
