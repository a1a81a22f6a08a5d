//! Logging bootstrap for aggkit.
//!
//! Library code emits `tracing` events; nothing is printed unless a
//! subscriber is installed. With the `tracing-subscriber` feature enabled,
//! [`init`] installs one controlled by:
//!
//! - `AGGKIT_DEBUG=true` - Enable debug-level logging
//! - `AGGKIT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `AGGKIT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use aggkit_core::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

use crate::config::{DEBUG_ENV, parse_flag};

static INIT: Once = Once::new();

/// Environment variable that selects the log level.
pub const LOG_LEVEL_ENV: &str = "AGGKIT_LOG_LEVEL";

/// Environment variable that selects the output format.
pub const LOG_FORMAT_ENV: &str = "AGGKIT_LOG_FORMAT";

/// Check if debug logging is enabled via `AGGKIT_DEBUG`.
///
/// Unparseable values count as disabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .ok()
        .and_then(|v| parse_flag(DEBUG_ENV, &v).ok())
        .unwrap_or(false)
}

/// Resolve a log level from an explicit setting and the debug flag.
///
/// Defaults to "debug" when debug is on, otherwise "warn".
pub fn resolve_log_level(level: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Resolve an output format name. Defaults to "json".
pub fn resolve_log_format(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Get the configured log level from the environment.
pub fn get_log_level() -> &'static str {
    resolve_log_level(env::var(LOG_LEVEL_ENV).ok().as_deref(), is_debug_enabled())
}

/// Get the configured log format from the environment.
pub fn get_log_format() -> &'static str {
    resolve_log_format(env::var(LOG_FORMAT_ENV).ok().as_deref())
}

/// Initialize the aggkit logging system.
///
/// Call once at startup; later calls are no-ops. Does nothing unless
/// `AGGKIT_DEBUG` or `AGGKIT_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LOG_LEVEL_ENV).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "aggkit={},aggkit_core={},aggkit_mongodb={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "aggkit logging initialized"
            );
        }
    });
}
