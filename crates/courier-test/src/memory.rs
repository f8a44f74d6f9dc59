//! In-memory connections.
//!
//! [`memory_pair`] returns a [`MemoryConnection`] to hand to
//! [`Server::handle_connection`](courier_server::Server::handle_connection)
//! and the [`TestClient`] that plays the remote peer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use courier_ws::{
    CloseCode, Connection, ConnectionReader, ConnectionWriter, Message, WsError, WsResult,
};
use tokio::sync::mpsc;

use crate::client::TestClient;

/// What the peer sends to the server.
#[derive(Debug)]
pub(crate) enum Inbound {
    Data(Vec<u8>),
    Close,
}

/// Server side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    outbound: mpsc::UnboundedSender<Message>,
}

/// Creates a connected server/peer pair.
pub fn memory_pair() -> (MemoryConnection, TestClient) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::unbounded_channel();
    (
        MemoryConnection { inbound, outbound },
        TestClient::new(to_server, from_server),
    )
}

impl Connection for MemoryConnection {
    fn into_split(self) -> (Box<dyn ConnectionReader>, Arc<dyn ConnectionWriter>) {
        let closed = Arc::new(AtomicBool::new(false));
        let reader = MemoryReader {
            inbound: self.inbound,
            closed: Arc::clone(&closed),
        };
        let writer = MemoryWriter {
            outbound: self.outbound,
            closed,
        };
        (Box::new(reader), Arc::new(writer))
    }
}

struct MemoryReader {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl ConnectionReader for MemoryReader {
    async fn read_message(&mut self) -> WsResult<Vec<u8>> {
        match self.inbound.recv().await {
            Some(Inbound::Data(bytes)) => Ok(bytes),
            Some(Inbound::Close) => {
                self.closed.store(true, Ordering::Release);
                Err(WsError::connection_closed(
                    Some(CloseCode::Normal.as_u16()),
                    "peer closed",
                ))
            }
            None => {
                self.closed.store(true, Ordering::Release);
                Err(WsError::connection_closed(None, "peer dropped"))
            }
        }
    }
}

struct MemoryWriter {
    outbound: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl ConnectionWriter for MemoryWriter {
    async fn write_message(&self, message: Message) -> WsResult<()> {
        if self.closed.load(Ordering::Acquire) && !message.is_close() {
            return Err(WsError::connection_closed(None, "connection already closed"));
        }
        self.outbound
            .send(message)
            .map_err(|_| WsError::send_failed("peer dropped"))
    }

    async fn close(&self) -> WsResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // The peer may already be gone.
        let _ = self.outbound.send(Message::close(CloseCode::Normal, ""));
        Ok(())
    }
}
