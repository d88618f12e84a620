//! Centralized logging initialization with environment variable support

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format for tooling
    Json,
}

impl LogFormat {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "human" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Apply `LOG_LEVEL` / `LOG_FORMAT` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|f| LogFormat::from_env_value(&f))
        {
            self.format = format;
        }
        self
    }
}

/// Initialize tracing subscriber with environment variable support
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_LEVEL`: Set log level (trace, debug, info, warn, error)
/// - `LOG_FORMAT`: Override format (json, pretty)
///
/// # Examples
///
/// ```bash
/// # Trace every mirrored edit
/// LOG_LEVEL=debug syncedit run --file main.rs --select 0..200 --script events.json
///
/// # Module-specific filtering
/// RUST_LOG=syncedit_engine::sync=trace syncedit scan --file main.rs --select 0..200
/// ```
pub fn initialize(config: &LoggingConfig) {
    let config = config.clone().with_env_overrides();
    let log_level = config.level.parse().unwrap_or(tracing::Level::INFO);

    // RUST_LOG takes precedence over the configured level
    let env_filter = EnvFilter::from_default_env().add_directive(log_level.into());

    // Always write to stderr to keep stdout clean for command output
    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Create a session span with standard fields for context propagation
///
/// Every log emitted while handling an event for `document` carries the
/// document name.
///
/// # Example
///
/// ```rust
/// use syncedit_config::logging::session_span;
///
/// let span = session_span("main.rs");
/// let _enter = span.enter();
/// tracing::info!("Handling click");
/// ```
pub fn session_span(document: &str) -> tracing::Span {
    tracing::info_span!("sync_session", document = %document)
}
