//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Listener and connection limits.
///
/// ```
/// use courier_config::ServerSection;
///
/// let server = ServerSection::default();
/// assert_eq!(server.bind_addr, "0.0.0.0:3000");
/// assert_eq!(server.path, "/");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Socket address the server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Request path the WebSocket upgrade is accepted on.
    #[serde(default = "default_path")]
    pub path: String,

    /// Seconds to wait for sessions to close after shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted inbound message, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            path: default_path(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_message_size() -> usize {
    64 << 20
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (`info`, `courier_server=debug,warn`, ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus exporter section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Serve metrics.
    #[serde(default)]
    pub enabled: bool,

    /// Address of the scrape endpoint.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name attached to logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        let server = ServerSection::default();
        assert_eq!(server.shutdown_timeout_secs, 30);
        assert_eq!(server.max_message_size, 64 * 1024 * 1024);

        let telemetry = TelemetrySection::default();
        assert_eq!(telemetry.service_name, "courier");
        assert!(telemetry.logging.enabled);
        assert_eq!(telemetry.logging.format, LogFormat::Json);
        assert!(!telemetry.metrics.enabled);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let server: ServerSection = toml::from_str(r#"path = "/ws""#).unwrap();
        assert_eq!(server.path, "/ws");
        assert_eq!(server.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<LoggingSection, _> = toml::from_str(r#"colour = true"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_names() {
        let logging: LoggingSection = serde_json::from_str(r#"{"format": "pretty"}"#).unwrap();
        assert_eq!(logging.format, LogFormat::Pretty);
    }
}
