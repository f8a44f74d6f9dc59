//! Prometheus metrics for Courier.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `courier_connections_total` | Counter | `outcome` | Accepted connections by admission outcome |
//! | `courier_active_sessions` | Gauge | - | Admitted sessions currently routing |
//! | `courier_events_total` | Counter | `channel`, `outcome` | Inbound events routed |
//! | `courier_broadcast_failures_total` | Counter | `channel` | Failed broadcast deliveries |
//! | `courier_auth_attempts_total` | Counter | `channel`, `outcome` | Auth challenge answers |
//! | `courier_room_members_changed_total` | Counter | `channel`, `change` | Room joins and lefts |
//!
//! Recording functions are no-ops until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admission outcome of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Passed auth and connected hooks.
    Admitted,
    /// Failed auth or a connected hook.
    Rejected,
}

impl ConnectionOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Rejected => "rejected",
        }
    }
}

/// Direction of a room membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomChange {
    /// A session joined a room.
    Join,
    /// A session left a room.
    Left,
}

impl RoomChange {
    fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Left => "left",
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime, or the exporter is driven
/// from a background thread.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();
    Ok(())
}

/// Registers descriptions for all standard metrics.
fn register_metric_descriptions() {
    describe_counter!(
        "courier_connections_total",
        "Accepted WebSocket connections by admission outcome"
    );
    describe_gauge!(
        "courier_active_sessions",
        "Sessions currently admitted and routing"
    );
    describe_counter!(
        "courier_events_total",
        "Inbound events routed, by channel and outcome"
    );
    describe_counter!(
        "courier_broadcast_failures_total",
        "Broadcast deliveries that failed"
    );
    describe_counter!(
        "courier_auth_attempts_total",
        "Authentication challenge answers by outcome"
    );
    describe_counter!(
        "courier_room_members_changed_total",
        "Room membership changes"
    );
}

/// Records the admission outcome of a connection.
pub fn record_connection(outcome: ConnectionOutcome) {
    counter!("courier_connections_total", "outcome" => outcome.as_str()).increment(1);
}

/// Records one routed inbound event.
pub fn record_event(channel: &str, ok: bool) {
    counter!(
        "courier_events_total",
        "channel" => channel.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

/// Records failed broadcast deliveries.
pub fn record_broadcast_failures(channel: &str, failures: usize) {
    counter!(
        "courier_broadcast_failures_total",
        "channel" => channel.to_string()
    )
    .increment(failures as u64);
}

/// Records an answered auth challenge.
pub fn record_auth_attempt(channel: &str, passed: bool) {
    counter!(
        "courier_auth_attempts_total",
        "channel" => channel.to_string(),
        "outcome" => if passed { "passed" } else { "rejected" }
    )
    .increment(1);
}

/// Records a room membership change.
pub fn record_room_change(channel: &str, change: RoomChange) {
    counter!(
        "courier_room_members_changed_total",
        "channel" => channel.to_string(),
        "change" => change.as_str()
    )
    .increment(1);
}

/// Keeps `courier_active_sessions` up while alive.
///
/// The gauge is decremented on drop, so every exit path of a session's
/// routing loop is counted.
pub struct ActiveSessionGuard {
    _private: (),
}

impl ActiveSessionGuard {
    /// Creates a new guard and increments the active sessions gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("courier_active_sessions").increment(1.0);
        Self { _private: () }
    }
}

impl Default for ActiveSessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        gauge!("courier_active_sessions").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_connection(ConnectionOutcome::Admitted);
        record_connection(ConnectionOutcome::Rejected);
        record_event("chat", true);
        record_event("chat", false);
        record_broadcast_failures("chat", 2);
        record_auth_attempt("secure", false);
        record_room_change("lobby", RoomChange::Join);
        drop(ActiveSessionGuard::new());
    }

    #[test]
    fn test_label_values() {
        assert_eq!(ConnectionOutcome::Admitted.as_str(), "admitted");
        assert_eq!(RoomChange::Left.as_str(), "left");
    }
}
