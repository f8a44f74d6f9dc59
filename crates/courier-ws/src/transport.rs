//! Transport seams.
//!
//! The server never touches sockets directly. An accepted connection is
//! split into a [`ConnectionReader`], owned by the session's read loop,
//! and a [`ConnectionWriter`], shared by everything that sends to the
//! session. Tests swap in in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WsResult;
use crate::message::Message;

/// The inbound half of a connection.
#[async_trait]
pub trait ConnectionReader: Send {
    /// Wait for the next data frame and return its payload.
    ///
    /// Control frames are handled internally. A close frame or the end of
    /// the stream yields [`WsError::ConnectionClosed`](crate::WsError::ConnectionClosed).
    async fn read_message(&mut self) -> WsResult<Vec<u8>>;
}

/// The outbound half of a connection.
///
/// Implementations must tolerate concurrent callers; the server still
/// serializes writes per session.
#[async_trait]
pub trait ConnectionWriter: Send + Sync {
    /// Write one frame.
    async fn write_message(&self, message: Message) -> WsResult<()>;

    /// Send a close frame. Closing twice is not an error.
    async fn close(&self) -> WsResult<()>;
}

/// An accepted connection that can be split into its two halves.
pub trait Connection: Send + 'static {
    /// Split into a reader and a shareable writer.
    fn into_split(self) -> (Box<dyn ConnectionReader>, Arc<dyn ConnectionWriter>);
}
