//! WebSocket configuration.

/// Configuration for accepted WebSocket connections.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Request path the upgrade is accepted on (default: `/`).
    pub path: String,
    /// Maximum inbound data frame size in bytes (default: 1 MB).
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_message_size: 1024 * 1024, // 1 MB
        }
    }
}

impl WebSocketConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upgrade path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the maximum message size.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.path, "/");
        assert_eq!(config.max_message_size, 1024 * 1024);
    }

    #[test]
    fn test_websocket_config_builder() {
        let config = WebSocketConfig::new().path("/ws").max_message_size(1024);
        assert_eq!(config.path, "/ws");
        assert_eq!(config.max_message_size, 1024);
    }
}
