//! WebSocket connection handling.
//!
//! This module provides the [`WebSocket`] type which wraps an accepted
//! tungstenite stream and splits it into the server's transport halves,
//! and [`accept`] which performs the handshake on a configured path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::WebSocketConfig;
use crate::error::{CloseCode, WsError, WsResult};
use crate::message::Message;
use crate::transport::{Connection, ConnectionReader, ConnectionWriter};

type Sink<S> = Arc<Mutex<SplitSink<WebSocketStream<S>, tungstenite::Message>>>;

/// A unique identifier for a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new time-ordered connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Perform the server handshake on `stream`.
///
/// Upgrades requested on any path other than `config.path` are refused
/// with `404 Not Found`.
pub async fn accept<S>(stream: S, config: WebSocketConfig) -> WsResult<WebSocket<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = config.path.clone();
    let callback = move |request: &Request, response: Response| {
        if request.uri().path() == path {
            Ok(response)
        } else {
            let mut error: ErrorResponse = ErrorResponse::new(Some(format!(
                "no websocket endpoint at {}",
                request.uri().path()
            )));
            *error.status_mut() = StatusCode::NOT_FOUND;
            Err(error)
        }
    };

    let stream = tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .map_err(|e| WsError::handshake_failed(e.to_string()))?;
    Ok(WebSocket::new(stream, config))
}

/// An accepted WebSocket connection.
pub struct WebSocket<S = tokio::net::TcpStream> {
    /// The unique connection ID.
    connection_id: ConnectionId,
    /// The sender half of the WebSocket stream.
    sender: Sink<S>,
    /// The receiver half of the WebSocket stream.
    receiver: SplitStream<WebSocketStream<S>>,
    /// Configuration for this connection.
    config: WebSocketConfig,
    /// When the connection was established.
    connected_at: Instant,
    /// Shared with every sender handle.
    closed: Arc<AtomicBool>,
}

impl<S> WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream.
    pub fn new(stream: WebSocketStream<S>, config: WebSocketConfig) -> Self {
        let (sender, receiver) = stream.split();
        Self {
            connection_id: ConnectionId::new(),
            sender: Arc::new(Mutex::new(sender)),
            receiver,
            config,
            connected_at: Instant::now(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the connection ID.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Get when the connection was established.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Check if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get a handle that can be used to send messages from other tasks.
    pub fn sender(&self) -> WebSocketSender<S> {
        WebSocketSender {
            connection_id: self.connection_id,
            sender: Arc::clone(&self.sender),
            closed: Arc::clone(&self.closed),
        }
    }

    /// Split into a reader and a sender.
    pub fn into_parts(self) -> (WebSocketReader<S>, WebSocketSender<S>) {
        let sender = self.sender();
        let reader = WebSocketReader {
            connection_id: self.connection_id,
            receiver: self.receiver,
            pong: sender.clone(),
            max_message_size: self.config.max_message_size,
        };
        (reader, sender)
    }
}

impl<S> Connection for WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn into_split(self) -> (Box<dyn ConnectionReader>, Arc<dyn ConnectionWriter>) {
        let (reader, sender) = self.into_parts();
        (Box::new(reader), Arc::new(sender))
    }
}

/// The inbound half of a [`WebSocket`].
pub struct WebSocketReader<S = tokio::net::TcpStream> {
    connection_id: ConnectionId,
    receiver: SplitStream<WebSocketStream<S>>,
    pong: WebSocketSender<S>,
    max_message_size: usize,
}

impl<S> WebSocketReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn check_size(&self, size: usize) -> WsResult<()> {
        if size > self.max_message_size {
            return Err(WsError::MessageTooBig {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }

    fn mark_closed(&self) {
        self.pong.closed.store(true, Ordering::Release);
    }
}

#[async_trait]
impl<S> ConnectionReader for WebSocketReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> WsResult<Vec<u8>> {
        loop {
            match self.receiver.next().await {
                Some(Ok(msg)) => match Message::from(msg) {
                    Message::Text(text) => {
                        self.check_size(text.len())?;
                        return Ok(text.into_bytes());
                    }
                    Message::Binary(data) => {
                        self.check_size(data.len())?;
                        return Ok(data);
                    }
                    Message::Ping(data) => {
                        debug!(connection_id = %self.connection_id, "Received ping, sending pong");
                        if let Err(e) = self.pong.write_message(Message::pong(data)).await {
                            warn!(connection_id = %self.connection_id, "Failed to send pong: {}", e);
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(frame) => {
                        debug!(connection_id = %self.connection_id, "Received close frame");
                        self.mark_closed();
                        let (code, reason) = frame.map_or((None, String::new()), |f| {
                            (Some(f.code), f.reason.into_owned())
                        });
                        return Err(WsError::connection_closed(code, reason));
                    }
                },
                Some(Err(e)) => {
                    self.mark_closed();
                    return Err(WsError::from(e));
                }
                None => {
                    self.mark_closed();
                    return Err(WsError::connection_closed(None, "stream ended"));
                }
            }
        }
    }
}

/// A handle for sending messages to a WebSocket from other tasks.
pub struct WebSocketSender<S = tokio::net::TcpStream> {
    /// The connection ID.
    connection_id: ConnectionId,
    /// The sender half.
    sender: Sink<S>,
    closed: Arc<AtomicBool>,
}

impl<S> Clone for WebSocketSender<S> {
    fn clone(&self) -> Self {
        Self {
            connection_id: self.connection_id,
            sender: Arc::clone(&self.sender),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<S> WebSocketSender<S> {
    /// Get the connection ID.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

#[async_trait]
impl<S> ConnectionWriter for WebSocketSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_message(&self, message: Message) -> WsResult<()> {
        if self.closed.load(Ordering::Acquire) && !message.is_close() {
            return Err(WsError::connection_closed(
                Some(CloseCode::Normal.as_u16()),
                "connection already closed",
            ));
        }

        let mut sender = self.sender.lock().await;
        sender
            .send(tungstenite::Message::from(message))
            .await
            .map_err(|e| WsError::send_failed(e.to_string()))
    }

    async fn close(&self) -> WsResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        debug!(connection_id = %self.connection_id, "Closing connection");
        let mut sender = self.sender.lock().await;
        match sender
            .send(Message::close(CloseCode::Normal, "").into())
            .await
            .map_err(WsError::from)
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_closed() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
