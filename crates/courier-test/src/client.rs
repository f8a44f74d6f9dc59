//! The remote peer of an in-memory connection.

use std::time::Duration;

use courier_core::protocol::{ERROR_CHANNEL, ERROR_EVENT};
use courier_core::{CoreError, Envelope, Event, JsonCodec};
use courier_ws::Message;
use tokio::sync::{mpsc, Mutex};

use crate::error::{TestError, TestResult};
use crate::memory::Inbound;

/// Default wait for [`TestClient::recv`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Speaks envelopes to a server over a [`memory_pair`](crate::memory_pair).
///
/// # Example
///
/// ```ignore
/// let (connection, client) = memory_pair();
/// tokio::spawn(async move { server.handle_connection(connection).await });
///
/// client.send("pingpong", &Ping { id: 1 })?;
/// let pong: Pong = client.expect_event("pingpong").await?;
/// ```
#[derive(Debug)]
pub struct TestClient {
    to_server: mpsc::UnboundedSender<Inbound>,
    from_server: Mutex<mpsc::UnboundedReceiver<Message>>,
    timeout: Duration,
}

impl TestClient {
    pub(crate) fn new(
        to_server: mpsc::UnboundedSender<Inbound>,
        from_server: mpsc::UnboundedReceiver<Message>,
    ) -> Self {
        Self {
            to_server,
            from_server: Mutex::new(from_server),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long `recv` waits.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends an event the way a client would.
    ///
    /// No send-direction checks run, so the server's received-field checks
    /// can be exercised.
    pub fn send<T: Event>(&self, channel: &str, event: &T) -> TestResult<()> {
        let body = serde_json::to_value(event)
            .map_err(|e| CoreError::encode(T::NAME, e))?;
        self.send_envelope(&Envelope::new(channel, T::ALIAS, body))
    }

    /// Sends a prepared envelope.
    pub fn send_envelope(&self, envelope: &Envelope) -> TestResult<()> {
        let bytes = envelope.encode(&JsonCodec)?;
        self.send_raw(bytes)
    }

    /// Sends raw bytes as one message.
    pub fn send_raw(&self, bytes: impl Into<Vec<u8>>) -> TestResult<()> {
        self.to_server
            .send(Inbound::Data(bytes.into()))
            .map_err(|_| TestError::Closed)
    }

    /// Closes the connection from the client side.
    pub fn close(&self) {
        let _ = self.to_server.send(Inbound::Close);
    }

    /// Waits for the next envelope.
    pub async fn recv(&self) -> TestResult<Envelope> {
        let mut from_server = self.from_server.lock().await;
        loop {
            let next = tokio::time::timeout(self.timeout, from_server.recv())
                .await
                .map_err(|_| TestError::Timeout(self.timeout))?;
            match next {
                Some(Message::Text(text)) => return Ok(Envelope::decode(&JsonCodec, text.as_bytes())?),
                Some(Message::Binary(bytes)) => return Ok(Envelope::decode(&JsonCodec, &bytes)?),
                Some(Message::Ping(_) | Message::Pong(_)) => {}
                Some(Message::Close(_)) | None => return Err(TestError::Closed),
            }
        }
    }

    /// Waits for the next envelope and decodes it as `T` sent on `channel`.
    pub async fn expect_event<T: Event>(&self, channel: &str) -> TestResult<T> {
        let envelope = self.recv().await?;
        if envelope.channel != channel || envelope.name != T::ALIAS {
            return Err(TestError::Unexpected {
                expected: format!("{channel}:{}", T::ALIAS),
                channel: envelope.channel,
                got: envelope.name,
            });
        }
        Ok(envelope.into_event()?)
    }

    /// Waits for an `errors:error` envelope and returns its message.
    pub async fn expect_error(&self) -> TestResult<String> {
        let envelope = self.recv().await?;
        if !envelope.is_error() {
            return Err(TestError::Unexpected {
                expected: format!("{ERROR_CHANNEL}:{ERROR_EVENT}"),
                channel: envelope.channel,
                got: envelope.name,
            });
        }
        Ok(envelope.body.as_str().unwrap_or_default().to_string())
    }

    /// Waits for the server to close the connection, skipping anything
    /// still in flight.
    pub async fn expect_closed(&self) -> TestResult<()> {
        loop {
            match self.recv().await {
                Err(TestError::Closed) => return Ok(()),
                Err(e) => return Err(e),
                Ok(_) => {}
            }
        }
    }

    /// Returns `true` if nothing arrives within `window`.
    pub async fn is_silent_for(&self, window: Duration) -> bool {
        let mut from_server = self.from_server.lock().await;
        tokio::time::timeout(window, from_server.recv()).await.is_err()
    }
}
