//! Logging utilities for capture layers
//!
//! The tracker only talks to the `log` facade. Layers and tools that want
//! output call one of the initializers below once at load time.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize logging with a default level, still overridable by `RUST_LOG`
///
/// Capture layers are usually loaded into processes that already own a
/// logger, so a second initialization is silently ignored.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
