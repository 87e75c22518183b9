//! Logging configuration and initialization
//!
//! Sets up the tracing subscriber used by the server and the CLI.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Normalize a configured level word to a tracing filter level
///
/// Only the first word is used so trailing comments in config values are
/// tolerated. Unknown levels fall back to `info`.
pub fn normalize_level(log_level: &str) -> &'static str {
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or("info")
        .to_lowercase();

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warning" | "warn" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize the logging system with the specified level
///
/// `RUST_LOG` takes precedence over `log_level`. `LOG_FORMAT=json` selects
/// structured JSON output.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
