//! WebSocket message types.
//!
//! This module defines the frames exchanged with a peer: text, binary,
//! ping/pong and close.

use std::borrow::Cow;

use crate::error::{CloseCode, WsError, WsResult};

/// A WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message.
    Binary(Vec<u8>),
    /// A ping frame with optional payload.
    Ping(Vec<u8>),
    /// A pong frame with optional payload.
    Pong(Vec<u8>),
    /// A close frame with optional code and reason.
    Close(Option<CloseFrame>),
}

impl Message {
    /// Create a new text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a new binary message.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Create a data frame from encoded bytes.
    ///
    /// Text frames must carry UTF-8, so `binary == false` validates the
    /// payload first.
    pub fn data(bytes: Vec<u8>, binary: bool) -> WsResult<Self> {
        if binary {
            return Ok(Self::Binary(bytes));
        }
        String::from_utf8(bytes)
            .map(Self::Text)
            .map_err(|e| WsError::EncodeFailed(e.to_string()))
    }

    /// Create a new pong message.
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::Pong(data.into())
    }

    /// Create a close message with a code and reason.
    pub fn close(code: CloseCode, reason: impl Into<String>) -> Self {
        Self::Close(Some(CloseFrame::new(code, reason)))
    }

    /// Check if this is a close message.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    /// Check if this is a data message (text or binary).
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Binary(_))
    }

    /// Convert the message into bytes.
    ///
    /// Returns `None` for close messages.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Text(s) => Some(s.into_bytes()),
            Self::Binary(b) | Self::Ping(b) | Self::Pong(b) => Some(b),
            Self::Close(_) => None,
        }
    }

    /// Get the length of the message payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) | Self::Ping(b) | Self::Pong(b) => b.len(),
            Self::Close(Some(frame)) => 2 + frame.reason.len(),
            Self::Close(None) => 0,
        }
    }

    /// Check if the message payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}

/// Convert from tungstenite Message.
impl From<tungstenite::Message> for Message {
    fn from(msg: tungstenite::Message) -> Self {
        match msg {
            tungstenite::Message::Text(s) => Self::Text(s.as_str().to_owned()),
            tungstenite::Message::Binary(b) => Self::Binary(b.to_vec()),
            tungstenite::Message::Ping(b) => Self::Ping(b.to_vec()),
            tungstenite::Message::Pong(b) => Self::Pong(b.to_vec()),
            tungstenite::Message::Close(frame) => Self::Close(frame.map(CloseFrame::from)),
            tungstenite::Message::Frame(_) => Self::Binary(vec![]),
        }
    }
}

/// Convert to tungstenite Message.
impl From<Message> for tungstenite::Message {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(s) => Self::Text(s.into()),
            Message::Binary(b) => Self::Binary(b.into()),
            Message::Ping(b) => Self::Ping(b.into()),
            Message::Pong(b) => Self::Pong(b.into()),
            Message::Close(frame) => {
                Self::Close(frame.map(tungstenite::protocol::CloseFrame::from))
            }
        }
    }
}

/// A WebSocket close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close code.
    pub code: u16,
    /// The close reason.
    pub reason: Cow<'static, str>,
}

impl CloseFrame {
    /// Create a new close frame.
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code: code.as_u16(),
            reason: Cow::Owned(reason.into()),
        }
    }

    /// Get the close code enum value if it's a standard code.
    pub fn close_code(&self) -> Option<CloseCode> {
        CloseCode::from_u16(self.code)
    }
}

impl From<tungstenite::protocol::CloseFrame> for CloseFrame {
    fn from(frame: tungstenite::protocol::CloseFrame) -> Self {
        Self {
            code: frame.code.into(),
            reason: Cow::Owned(frame.reason.as_str().to_owned()),
        }
    }
}

impl From<CloseFrame> for tungstenite::protocol::CloseFrame {
    fn from(frame: CloseFrame) -> Self {
        Self {
            code: frame.code.into(),
            reason: frame.reason.into_owned().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_text_requires_utf8() {
        let msg = Message::data(b"hello".to_vec(), false).unwrap();
        assert_eq!(msg, Message::Text("hello".to_string()));

        let err = Message::data(vec![0xff, 0xfe], false).unwrap_err();
        assert!(matches!(err, WsError::EncodeFailed(_)));
    }

    #[test]
    fn test_data_binary_passthrough() {
        let msg = Message::data(vec![0xff, 0xfe], true).unwrap();
        assert_eq!(msg, Message::Binary(vec![0xff, 0xfe]));
        assert!(msg.is_data());
    }

    #[test]
    fn test_message_close() {
        let msg = Message::close(CloseCode::Normal, "goodbye");
        assert!(msg.is_close());
        assert_eq!(msg.len(), 2 + "goodbye".len());
        match msg {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.close_code(), Some(CloseCode::Normal));
                assert_eq!(frame.reason, "goodbye");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_into_bytes() {
        assert_eq!(Message::text("ab").into_bytes(), Some(b"ab".to_vec()));
        assert_eq!(Message::Close(None).into_bytes(), None);
    }

    #[test]
    fn test_tungstenite_conversion() {
        let original = Message::text("ping");
        let converted: tungstenite::Message = original.clone().into();
        assert_eq!(Message::from(converted), original);

        let close = Message::close(CloseCode::GoingAway, "bye");
        let converted: tungstenite::Message = close.clone().into();
        assert_eq!(Message::from(converted), close);
    }
}
