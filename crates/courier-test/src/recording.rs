//! A writer that records what the server sends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use courier_core::{Envelope, Event, JsonCodec};
use courier_ws::{ConnectionWriter, Message, WsError, WsResult};
use parking_lot::Mutex;
use serde_json::Value;

/// One event written to a [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Channel alias.
    pub channel: String,
    /// Event alias.
    pub name: String,
    /// Unencoded body.
    pub body: Value,
    /// When it was written.
    pub timestamp: Instant,
}

impl RecordedEvent {
    /// Decodes the body as `T`.
    pub fn decode<T: Event>(&self) -> Option<T> {
        if self.name != T::ALIAS {
            return None;
        }
        serde_json::from_value(self.body.clone()).ok()
    }
}

/// A [`ConnectionWriter`] that keeps every envelope instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    events: Mutex<Vec<RecordedEvent>>,
    closed: AtomicBool,
}

impl RecordingWriter {
    /// Creates an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything recorded so far, oldest first.
    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Every recorded body of type `T`, oldest first.
    pub fn events<T: Event>(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(RecordedEvent::decode::<T>)
            .collect()
    }

    /// Whether an event equal to `event` was recorded.
    pub fn has_event<T: Event + PartialEq>(&self, event: &T) -> bool {
        self.events::<T>().iter().any(|recorded| recorded == event)
    }

    /// Number of recorded events named like `T`.
    pub fn count<T: Event>(&self) -> usize {
        self.events.lock().iter().filter(|e| e.name == T::ALIAS).count()
    }

    /// Recorded `errors:error` messages.
    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.channel == courier_core::protocol::ERROR_CHANNEL)
            .filter_map(|e| e.body.as_str().map(str::to_string))
            .collect()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Whether the server closed the writer.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ConnectionWriter for RecordingWriter {
    async fn write_message(&self, message: Message) -> WsResult<()> {
        let bytes = match message {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            _ => return Ok(()),
        };
        let envelope = Envelope::decode(&JsonCodec, &bytes)
            .map_err(|e| WsError::send_failed(e.to_string()))?;
        self.events.lock().push(RecordedEvent {
            channel: envelope.channel,
            name: envelope.name,
            body: envelope.body,
            timestamp: Instant::now(),
        });
        Ok(())
    }

    async fn close(&self) -> WsResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
