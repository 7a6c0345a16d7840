//! Console logging for hosts and tests driving the headless control.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a compact console subscriber.
///
/// `RUST_LOG` overrides the default level (DEBUG in debug builds, INFO
/// otherwise). Calling this more than once is a no-op, as is calling it when
/// another global subscriber is already installed.
pub fn init() {
    INIT.call_once(|| {
        let level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

        let result = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_test_writer()
            .try_init();
        if result.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}
