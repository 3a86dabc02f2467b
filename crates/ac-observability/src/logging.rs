//! Structured logging using the tracing ecosystem.
//!
//! Log output goes to stderr so that command output on stdout stays clean.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Crates whose events are enabled by the default filter.
const LOG_TARGETS: &[&str] = &["ac_client", "ac_observability", "asset_catalog"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include thread IDs.
    pub include_thread_ids: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Maps a `-v` count onto a level: none is WARN, then INFO, DEBUG, TRACE.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            include_spans: verbose >= 2,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_json(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// The filter used when `RUST_LOG` is not set.
    pub fn filter_directives(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parses a level name such as `info` or `DEBUG`.
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse().ok()
}

/// Initializes the logging system with default configuration.
pub fn init_logging() -> Result<(), TryInitError> {
    init_logging_with_config(LoggingConfig::default())
}

/// Initializes the logging system with the given configuration.
///
/// `RUST_LOG` overrides the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    }
}

/// Creates a span for one CLI command.
#[macro_export]
macro_rules! command_span {
    ($command:expr) => {
        tracing::info_span!("command", command = %$command)
    };
    ($command:expr, $($field:tt)*) => {
        tracing::info_span!("command", command = %$command, $($field)*)
    };
}

/// Creates a span for work on a single asset.
#[macro_export]
macro_rules! asset_span {
    ($asset_id:expr) => {
        tracing::info_span!("asset", asset_id = %$asset_id)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.json_format);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).level, Level::WARN);
        assert_eq!(LoggingConfig::from_verbosity(1).level, Level::INFO);
        assert_eq!(LoggingConfig::from_verbosity(2).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_verbosity(9).level, Level::TRACE);
    }

    #[test]
    fn test_filter_directives() {
        let config = LoggingConfig::default().with_level(Level::DEBUG);
        assert_eq!(
            config.filter_directives(),
            "ac_client=DEBUG,ac_observability=DEBUG,asset_catalog=DEBUG"
        );
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level(" DEBUG "), Some(Level::DEBUG));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_spans_expand() {
        let _command = command_span!("search", asset_type = "term");
        let _asset = asset_span!("6662c0f2.e1b1ec6c");
    }
}
