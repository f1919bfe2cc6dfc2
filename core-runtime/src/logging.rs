//! # Logging
//!
//! `tracing` subscriber setup for the CLI. Workspace crates log at the level
//! chosen by `-v`, the HTTP stack is held at `warn`, and `RUST_LOG` replaces
//! the whole filter when set. Everything goes to stderr; stdout carries only
//! command output such as `sync list`.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_verbosity(1).with_format(LogFormat::Json))?;
//! tracing::info!(url = %url, "Downloading document");
//! ```

use crate::error::{Error, Result};

use std::io;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

const WORKSPACE_TARGETS: &[&str] = &[
    "feishu2md",
    "core_runtime",
    "core_docx",
    "core_bitable",
    "core_sync",
    "provider_feishu",
    "bridge_desktop",
];

const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

const SENSITIVE_FIELDS: &[&str] = &["secret", "token", "authorization", "password"];

/// Verbosity of the workspace crates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, for reading a single failing run
    Pretty,
    /// One JSON object per event
    Json,
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for workspace crates
    pub level: LogLevel,
    /// Explicit filter directives; wins over `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Map a `-v` count: none is info, one is debug, more is trace
    pub fn from_verbosity(count: u8) -> Self {
        let level = match count {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
        Self::default().with_level(level)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber
///
/// Fails when a subscriber is already installed or the filter does not parse.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    // Targets only help once someone is tracing a specific crate
    let show_target = config.level == LogLevel::Trace;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(show_target)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(show_target)
            .with_writer(io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn default_directives(level: LogLevel) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level.as_str())),
    );
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)));
    directives.join(",")
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(from_env) if !from_env.trim().is_empty() => from_env,
            _ => default_directives(config.level),
        },
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Mask credential values before they reach logs or stdout
///
/// The first four characters of a long secret stay visible so two configs
/// can still be told apart.
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let field = field_name.to_ascii_lowercase();
    if !SENSITIVE_FIELDS.iter().any(|s| field.contains(s)) || value.is_empty() {
        return value.to_string();
    }

    let chars = value.chars().count();
    if chars <= 8 {
        "[REDACTED]".to_string()
    } else {
        let prefix: String = value.chars().take(4).collect();
        format!("{}***", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).level, LogLevel::Info);
        assert_eq!(LoggingConfig::from_verbosity(1).level, LogLevel::Debug);
        assert_eq!(LoggingConfig::from_verbosity(4).level, LogLevel::Trace);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_redact_secrets() {
        assert_eq!(redact_if_sensitive("app_secret", "s3cr3t"), "[REDACTED]");
        assert_eq!(
            redact_if_sensitive("app_secret", "Xy9kLmN0pQ2rS4tU"),
            "Xy9k***"
        );
        assert_eq!(redact_if_sensitive("tenant_access_token", ""), "");
        assert_eq!(redact_if_sensitive("app_id", "cli_a1b2c3d4e5"), "cli_a1b2c3d4e5");
    }

    #[test]
    fn test_default_directives() {
        let directives = default_directives(LogLevel::Debug);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("core_bitable=debug"));
        assert!(directives.contains("provider_feishu=debug"));
        assert!(directives.contains("reqwest=warn"));
    }

    #[test]
    fn test_custom_filter_wins() {
        let config = LoggingConfig::default().with_filter("core_sync=debug,core_bitable=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_bitable=trace"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_sync=[");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }
}
