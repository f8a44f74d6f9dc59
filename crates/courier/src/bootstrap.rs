//! Turning a loaded [`CourierConfig`] into runtime pieces.

use std::time::Duration;

use courier_config::{ConfigError, ConfigLoader, CourierConfig, LogFormat};
use courier_server::{Server, ServerConfig};
use courier_telemetry::{LogConfig, MetricsConfig, TelemetryConfig, TelemetryError};
use thiserror::Error;

/// Failure while starting up from configuration.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// The server settings of `config`.
pub fn server_config(config: &CourierConfig) -> ServerConfig {
    let server = &config.server;
    ServerConfig::builder()
        .bind_addr(server.bind_addr.as_str())
        .path(server.path.as_str())
        .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
        .max_message_size(server.max_message_size)
        .build()
}

/// The telemetry settings of `config`.
pub fn telemetry_config(config: &CourierConfig) -> TelemetryConfig {
    let telemetry = &config.telemetry;
    let logging = &telemetry.logging;
    let pretty = logging.format == LogFormat::Pretty;

    TelemetryConfig::new(telemetry.service_name.as_str())
        .with_logging(LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            json_format: !pretty,
            span_events: pretty,
            file_line_info: logging.include_location,
            include_target: true,
            service_name: telemetry.service_name.clone(),
        })
        .with_metrics(MetricsConfig {
            enabled: telemetry.metrics.enabled,
            addr: telemetry.metrics.addr.clone(),
        })
}

/// Installs telemetry for `config` and returns a server configured by it.
///
/// # Errors
///
/// Returns `BootstrapError::Telemetry` if logging or the metrics exporter
/// cannot be installed.
pub fn bootstrap(config: &CourierConfig) -> Result<Server, BootstrapError> {
    courier_telemetry::init_telemetry(&telemetry_config(config))?;
    Ok(Server::new(server_config(config)))
}

/// Loads `courier.toml` (if present), `.env` and `COURIER__*` overrides,
/// then [`bootstrap`]s.
///
/// # Errors
///
/// Returns `BootstrapError` if loading, validation or telemetry setup fails.
pub fn bootstrap_from_env() -> Result<(CourierConfig, Server), BootstrapError> {
    let config = ConfigLoader::new()
        .with_optional_file("courier.toml")?
        .with_dotenv()?
        .with_default_env()
        .load()?;
    let server = bootstrap(&config)?;
    Ok((config, server))
}
