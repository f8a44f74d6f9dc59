//! The wire envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::Codec;
use crate::error::{CoreError, CoreResult};
use crate::event::Event;
use crate::protocol::{ERROR_CHANNEL, ERROR_EVENT};

/// One event on the wire: the channel it belongs to, the event's protocol
/// alias and its body.
///
/// The body is kept as an unencoded [`Value`] until the whole envelope is
/// passed through a [`Codec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel alias.
    pub channel: String,
    /// Event protocol alias.
    pub name: String,
    /// Event body.
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// Create an envelope from raw parts.
    pub fn new(channel: impl Into<String>, name: impl Into<String>, body: Value) -> Self {
        Self {
            channel: channel.into(),
            name: name.into(),
            body,
        }
    }

    /// Build an outbound envelope for a typed event.
    ///
    /// Runs [`Event::check_send_fields`] before serializing.
    pub fn from_event<T: Event>(channel: impl Into<String>, event: &T) -> CoreResult<Self> {
        event.check_send_fields()?;
        let body = serde_json::to_value(event).map_err(|e| CoreError::encode(T::NAME, e))?;
        Ok(Self::new(channel, T::ALIAS, body))
    }

    /// Decode the body into a typed event.
    ///
    /// Runs [`Event::check_received_fields`] after deserializing.
    pub fn into_event<T: Event>(self) -> CoreResult<T> {
        let event: T =
            serde_json::from_value(self.body).map_err(|e| CoreError::decode(T::NAME, e))?;
        event.check_received_fields()?;
        Ok(event)
    }

    /// The reserved error envelope carrying a human readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR_CHANNEL, ERROR_EVENT, Value::String(message.into()))
    }

    /// Whether this is the reserved error envelope.
    pub fn is_error(&self) -> bool {
        self.channel == ERROR_CHANNEL && self.name == ERROR_EVENT
    }

    /// Encode the envelope with a codec.
    pub fn encode(&self, codec: &dyn Codec) -> CoreResult<Vec<u8>> {
        let value = serde_json::to_value(self).map_err(|e| CoreError::encode("envelope", e))?;
        codec.encode(&value)
    }

    /// Decode an envelope with a codec.
    pub fn decode(codec: &dyn Codec, bytes: &[u8]) -> CoreResult<Self> {
        let value = codec.decode(bytes)?;
        serde_json::from_value(value).map_err(|e| CoreError::decode("envelope", e))
    }
}
