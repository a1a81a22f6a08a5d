//! Builder configuration.
//!
//! # Environment Variables
//!
//! - `AGGKIT_DEBUG=true|1|yes` - Record a debug log while building pipelines
//! - `AGGKIT_DEBUG=false|0|no` (or unset) - No debug log

use std::env;

use crate::error::ConfigError;

/// Environment variable that turns debug logging on.
pub const DEBUG_ENV: &str = "AGGKIT_DEBUG";

/// Construction-time settings for a [`PipelineBuilder`](crate::PipelineBuilder).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Record a human-readable entry for every builder operation.
    pub debug: bool,
}

impl BuilderConfig {
    /// Create a configuration with debug mode disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable debug mode.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Read the configuration through a variable lookup function.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = match lookup(DEBUG_ENV) {
            Some(value) => parse_flag(DEBUG_ENV, &value)?,
            None => false,
        };
        Ok(Self { debug })
    }
}

/// Interpret a boolean flag value.
///
/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`/empty,
/// case-insensitively.
pub fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, value)),
    }
}
