//! Writers and session builders for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Envelope, JsonCodec};
use courier_ws::{ConnectionWriter, Message, WsError, WsResult};
use parking_lot::Mutex;

use crate::session::{Session, SessionId};

#[derive(Default)]
pub(crate) struct RecordingWriter {
    sent: Mutex<Vec<Message>>,
    closed: AtomicBool,
    failing: AtomicBool,
}

impl RecordingWriter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        let writer = Self::new();
        writer.failing.store(true, Ordering::SeqCst);
        writer
    }

    pub(crate) fn envelopes(&self) -> Vec<Envelope> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(text).ok(),
                Message::Binary(bytes) => serde_json::from_slice(bytes).ok(),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.envelopes().into_iter().map(|e| e.name).collect()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionWriter for RecordingWriter {
    async fn write_message(&self, message: Message) -> WsResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WsError::send_failed("broken pipe"));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    async fn close(&self) -> WsResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn session(id: u64) -> Arc<Session> {
    session_with(id, &RecordingWriter::new())
}

pub(crate) fn session_with(id: u64, writer: &Arc<RecordingWriter>) -> Arc<Session> {
    let writer: Arc<dyn ConnectionWriter> = Arc::clone(writer) as Arc<dyn ConnectionWriter>;
    Arc::new(Session::new(SessionId::new(id), writer, Arc::new(JsonCodec)))
}
