//! Error types for WebSocket operations.
//!
//! This module defines the error types that can occur during the
//! handshake, while reading frames and while writing frames.

use std::fmt;
use thiserror::Error;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors that can occur during WebSocket operations.
#[derive(Debug, Error)]
pub enum WsError {
    /// The WebSocket handshake failed.
    #[error("WebSocket handshake failed: {0}")]
    HandshakeFailed(String),

    /// The WebSocket connection was closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Optional close code from the peer.
        code: Option<u16>,
        /// Reason for closing.
        reason: String,
    },

    /// Failed to send a message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// An inbound data frame exceeded the configured limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooBig {
        /// Received payload size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A text payload was not valid UTF-8.
    #[error("failed to encode message: {0}")]
    EncodeFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WsError {
    /// Create a new handshake failed error.
    pub fn handshake_failed(reason: impl Into<String>) -> Self {
        Self::HandshakeFailed(reason.into())
    }

    /// Create a new connection closed error.
    pub fn connection_closed(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Create a new send failed error.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }

    /// Get the close code if this is a connection closed error.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::ConnectionClosed { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether the peer went away, cleanly or not.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed { .. } => true,
            Self::Tungstenite(e) => matches!(
                e,
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                    )
            ),
            _ => false,
        }
    }

    /// Check if this error indicates the connection should be closed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::EncodeFailed(_))
    }
}

/// Close code for WebSocket connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure (1000).
    Normal = 1000,
    /// Going away (1001).
    GoingAway = 1001,
    /// Protocol error (1002).
    Protocol = 1002,
    /// Unsupported data (1003).
    Unsupported = 1003,
    /// No status received (1005).
    NoStatus = 1005,
    /// Abnormal closure (1006).
    Abnormal = 1006,
    /// Invalid payload data (1007).
    InvalidPayload = 1007,
    /// Policy violation (1008).
    PolicyViolation = 1008,
    /// Message too big (1009).
    MessageTooBig = 1009,
    /// Internal error (1011).
    InternalError = 1011,
}

impl CloseCode {
    /// Convert from a u16 code.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::Protocol),
            1003 => Some(Self::Unsupported),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1011 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Get the u16 value of this close code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "Normal",
            Self::GoingAway => "GoingAway",
            Self::Protocol => "Protocol",
            Self::Unsupported => "Unsupported",
            Self::NoStatus => "NoStatus",
            Self::Abnormal => "Abnormal",
            Self::InvalidPayload => "InvalidPayload",
            Self::PolicyViolation => "PolicyViolation",
            Self::MessageTooBig => "MessageTooBig",
            Self::InternalError => "InternalError",
        };
        write!(f, "{} ({})", name, self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_error_connection_closed() {
        let err = WsError::connection_closed(Some(1000), "normal closure");
        assert_eq!(err.close_code(), Some(1000));
        assert!(err.is_closed());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_ws_error_encode_not_fatal() {
        let err = WsError::EncodeFailed("invalid utf-8".to_string());
        assert!(!err.is_fatal());
        assert!(!err.is_closed());
    }

    #[test]
    fn test_tungstenite_close_is_closed() {
        let err = WsError::from(tungstenite::Error::ConnectionClosed);
        assert!(err.is_closed());
    }

    #[test]
    fn test_read_io_failure_is_fatal() {
        let err = WsError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(err.is_fatal());
        assert!(!err.is_closed());
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_message_too_big_display() {
        let err = WsError::MessageTooBig { size: 10, max: 4 };
        assert_eq!(err.to_string(), "message of 10 bytes exceeds the 4 byte limit");
    }

    #[test]
    fn test_close_code_roundtrip() {
        assert_eq!(CloseCode::from_u16(1000), Some(CloseCode::Normal));
        assert_eq!(CloseCode::from_u16(1009), Some(CloseCode::MessageTooBig));
        assert_eq!(CloseCode::from_u16(9999), None);
        assert_eq!(CloseCode::GoingAway.as_u16(), 1001);
    }

    #[test]
    fn test_close_code_display() {
        assert_eq!(CloseCode::Normal.to_string(), "Normal (1000)");
        assert_eq!(CloseCode::Protocol.to_string(), "Protocol (1002)");
    }
}
