//! Server configuration.
//!
//! ```rust
//! use courier_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .bind_addr("127.0.0.1:4000")
//!     .path("/ws")
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.bind_addr(), "127.0.0.1:4000");
//! assert_eq!(config.path(), "/ws");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use courier_ws::WebSocketConfig;

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Default WebSocket upgrade path.
pub const DEFAULT_PATH: &str = "/";

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default inbound message limit (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Settings for the accept loop and the accepted connections.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind_addr: String,
    path: String,
    shutdown_timeout: Duration,
    max_message_size: usize,
}

impl ServerConfig {
    /// Creates a builder with default values.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Listener address, e.g. `0.0.0.0:3000`.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Parses [`bind_addr`](Self::bind_addr).
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr.parse()
    }

    /// Path the WebSocket upgrade is accepted on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// How long `serve` waits for sessions to drain after shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Largest accepted inbound message in bytes.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Settings handed to the WebSocket handshake for each connection.
    pub fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig::new()
            .path(self.path.clone())
            .max_message_size(self.max_message_size)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind_addr: String,
    path: String,
    shutdown_timeout: Duration,
    max_message_size: usize,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            path: DEFAULT_PATH.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the listener address.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the upgrade path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the inbound message limit.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            path: self.path,
            shutdown_timeout: self.shutdown_timeout,
            max_message_size: self.max_message_size,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(config.path(), "/");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_message_size(), 64 * 1024 * 1024);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().bind_addr("127.0.0.1:8080").build();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        let bad = ServerConfig::builder().bind_addr("nowhere").build();
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_websocket_settings_follow_server() {
        let config = ServerConfig::builder()
            .path("/events")
            .max_message_size(512)
            .build();
        let ws = config.websocket();
        assert_eq!(ws.path, "/events");
        assert_eq!(ws.max_message_size, 512);
    }
}
