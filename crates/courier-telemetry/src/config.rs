//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Logging and metrics settings for one Courier process.
///
/// The service name is stamped onto the logging settings, so the
/// `Logging initialized` line says which server started.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name of the server process, e.g. `chat`.
    pub service_name: String,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,

    /// Log output settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// JSON logs at `info`, metrics off.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_logging_preset(service_name.into(), LogConfig::production())
    }

    /// Pretty logs at `debug` with span events and locations, metrics off.
    pub fn development(service_name: impl Into<String>) -> Self {
        Self::with_logging_preset(service_name.into(), LogConfig::development())
    }

    fn with_logging_preset(service_name: String, mut logging: LogConfig) -> Self {
        logging.service_name.clone_from(&service_name);
        Self {
            service_name,
            metrics: MetricsConfig::default(),
            logging,
        }
    }

    /// Replaces the logging settings, keeping this config's service name.
    #[must_use]
    pub fn with_logging(mut self, mut logging: LogConfig) -> Self {
        logging.service_name.clone_from(&self.service_name);
        self.logging = logging;
        self
    }

    /// Replaces the metrics settings.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    /// Serves Prometheus metrics on `addr`.
    #[must_use]
    pub fn with_metrics_addr(self, addr: impl Into<String>) -> Self {
        self.with_metrics(MetricsConfig {
            enabled: true,
            addr: addr.into(),
        })
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("courier")
    }
}
