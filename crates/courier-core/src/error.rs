//! Error types for encoding, decoding and routing events.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while turning events into envelopes and back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A value could not be encoded.
    #[error("failed to encode {what}: {reason}")]
    Encode {
        /// What was being encoded (envelope, event name, ...).
        what: String,
        /// Underlying codec message.
        reason: String,
    },

    /// A value could not be decoded.
    #[error("failed to decode {what}: {reason}")]
    Decode {
        /// What was being decoded.
        what: String,
        /// Underlying codec message.
        reason: String,
    },

    /// The envelope carried no channel.
    #[error("empty channel")]
    EmptyChannel,

    /// The envelope carried no event name.
    #[error("empty event name")]
    EmptyEventName,

    /// The channel has no handler for this event.
    #[error("handler for event '{event}' on channel '{channel}' was not expected")]
    MissingHandler {
        /// Channel name.
        channel: String,
        /// Event name as received.
        event: String,
    },

    /// A client set a field that only the server may set.
    #[error("invalid received event {event}: field '{field}' is server to client only")]
    ReceivedFields {
        /// Event name.
        event: String,
        /// Offending field.
        field: String,
    },

    /// The server set a field that only clients may set.
    #[error("invalid sent event {event}: field '{field}' is client to server only")]
    SendFields {
        /// Event name.
        event: String,
        /// Offending field.
        field: String,
    },

    /// An `edd:room:` event that is not one of the room requests.
    #[error("unknown room event {0}")]
    UnknownRoomEvent(String),
}

impl CoreError {
    /// Create a new encode error.
    pub fn encode(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encode {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new decode error.
    pub fn decode(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new missing handler error.
    pub fn missing_handler(channel: impl Into<String>, event: impl Into<String>) -> Self {
        Self::MissingHandler {
            channel: channel.into(),
            event: event.into(),
        }
    }

    /// Create a new received fields error.
    pub fn received_fields(event: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ReceivedFields {
            event: event.into(),
            field: field.into(),
        }
    }

    /// Create a new send fields error.
    pub fn send_fields(event: impl Into<String>, field: impl Into<String>) -> Self {
        Self::SendFields {
            event: event.into(),
            field: field.into(),
        }
    }

    /// Whether this error comes from a directional field check.
    pub fn is_direction_violation(&self) -> bool {
        matches!(self, Self::ReceivedFields { .. } | Self::SendFields { .. })
    }
}
