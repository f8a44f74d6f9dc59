//! The root configuration type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, ServerSection, TelemetrySection};

/// Complete Courier server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// ```
/// use courier_config::CourierConfig;
///
/// let config = CourierConfig::default();
/// assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl CourierConfig {
    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the bind address or an enabled metrics address is not a socket address
    /// - the upgrade path is empty or does not start with `/`
    /// - the message size limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_addr("server.bind_addr", &self.server.bind_addr)?;

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server.path",
                format!("must start with '/': {:?}", self.server.path),
            ));
        }

        if self.server.max_message_size == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_message_size",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled {
            check_addr("telemetry.metrics.addr", &self.telemetry.metrics.addr)?;
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs with source locations.
    ///
    /// ```
    /// use courier_config::CourierConfig;
    ///
    /// let config = CourierConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.bind_addr = "127.0.0.1:3000".to_string();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Production preset: JSON info logs and a metrics endpoint.
    ///
    /// ```
    /// use courier_config::{CourierConfig, LogFormat};
    ///
    /// let config = CourierConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// assert!(config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.metrics.enabled = true;
        config
    }
}

fn check_addr(field: &str, addr: &str) -> Result<(), ConfigError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid socket address: {addr}")))
}
