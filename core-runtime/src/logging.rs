//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack for the engine:
//! - pretty, compact or JSON output
//! - `EnvFilter`-based module filtering (`RUST_LOG` or an explicit filter)
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("core_player=debug,provider_bilibili=info");
//! init_logging(config).expect("failed to initialize logging");
//!
//! tracing::info!("engine started");
//! ```

use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Default level when no filter is supplied (e.g. "info")
    pub default_level: String,
    /// Custom filter string (e.g. "core_player=debug,core_playback=trace");
    /// overrides `default_level` and the `RUST_LOG` environment variable.
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_level: "info".to_string(),
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the fallback level used when no explicit filter applies
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Set an explicit filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; a second call reports an error instead of
/// panicking so tests that race on initialization stay quiet.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match &config.filter {
        Some(spec) => EnvFilter::try_new(spec)
            .map_err(|e| Error::LoggingInit(format!("bad filter '{}': {}", spec, e)))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_level.clone())),
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.display_target),
            )
            .try_init(),
    };

    result.map_err(|e| Error::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_round_trip() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level("debug")
            .with_filter("core_player=trace");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.default_level, "debug");
        assert_eq!(config.filter.as_deref(), Some("core_player=trace"));
    }

    #[test]
    fn bad_filter_is_an_error() {
        let config = LoggingConfig::default().with_filter("===");
        assert!(init_logging(config).is_err());
    }
}
