//! Structured logging for Courier.
//!
//! [`init_logging`] installs a `tracing-subscriber` registry with an env
//! filter and a JSON or pretty formatter. Everything a server logs about a
//! connection happens inside that connection's [`session_span`], so each
//! line carries its `session_id` without repeating it.
//!
//! ```rust,ignore
//! use courier_telemetry::logging::{init_logging, session_span, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! let _entered = session_span(7).entered();
//! tracing::info!(channel = "chat", "Session admitted");
//! ```

use tracing::Span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Log output settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `courier_server=debug,warn`.
    pub level: String,

    /// JSON lines instead of the pretty multi-line format.
    pub json_format: bool,

    /// Log session span creation and close.
    pub span_events: bool,

    /// Include file and line of each log call.
    pub file_line_info: bool,

    /// Include the module path of each log call.
    pub include_target: bool,

    /// Server name logged once logging is up.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty output at `debug`, with session open/close events.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            include_target: true,
            service_name: "courier".to_string(),
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
            service_name: "courier".to_string(),
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let format = tracing_subscriber::fmt::layer()
        .with_span_events(config.fmt_span())
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);
    let format: Box<dyn Layer<Registry> + Send + Sync> = if config.json_format {
        format.json().boxed()
    } else {
        format.pretty().boxed()
    };

    tracing_subscriber::registry()
        .with(format.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(service = %config.service_name, "Logging initialized");
    Ok(())
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// The span one connection's lifecycle runs in.
pub fn session_span(session_id: u64) -> Span {
    tracing::info_span!("session", session_id)
}
