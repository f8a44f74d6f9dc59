//! Behaviour harness for a single channel.
//!
//! [`ChannelBehave`] registers one channel on a real [`Server`] and drives
//! it without connections: clients are sessions backed by
//! [`RecordingWriter`]s, added and removed through the channel's
//! `connected` / `disconnected` hooks, and events are dispatched through
//! the server's normal routing.
//!
//! ```ignore
//! let behave = ChannelBehave::given(Arc::new(ChatChannel::new()))?;
//! behave.add_client(1).await?;
//! behave.add_client(2).await?;
//! behave.dispatch(1, &Message { user_id: None, text: "hi".into() }).await?;
//! assert!(behave.client(2)?.has_event(&Message { user_id: Some(1), text: "hi".into() }));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::{Envelope, Event, JsonCodec};
use courier_server::{Channel, Context, Server, ServerConfig, Session, SessionId};
use parking_lot::RwLock;

use crate::error::{TestError, TestResult};
use crate::recording::RecordingWriter;

struct BehaveClient {
    session: Arc<Session>,
    writer: Arc<RecordingWriter>,
}

/// Drives one channel through its lifecycle hooks and routing.
pub struct ChannelBehave<C: Channel> {
    server: Server,
    channel: Arc<C>,
    clients: RwLock<HashMap<u64, BehaveClient>>,
}

impl<C: Channel> ChannelBehave<C> {
    /// Registers `channel` on a fresh server.
    pub fn given(channel: Arc<C>) -> TestResult<Self> {
        let server = Server::new(ServerConfig::default());
        server.register(Arc::clone(&channel) as Arc<dyn Channel>)?;
        Ok(Self {
            server,
            channel,
            clients: RwLock::new(HashMap::new()),
        })
    }

    /// The server the channel is registered on.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// The channel under test.
    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    /// Adds a client: the session enters the registry, then the channel's
    /// `connected` hook runs. A refused client is removed again.
    pub async fn add_client(&self, id: u64) -> TestResult<()> {
        let writer = RecordingWriter::new();
        let session = Arc::new(Session::new(
            SessionId::new(id),
            Arc::clone(&writer) as Arc<dyn courier_ws::ConnectionWriter>,
            Arc::new(JsonCodec),
        ));
        self.server.registry().add(Arc::clone(&session));
        self.clients.write().insert(
            id,
            BehaveClient {
                session: Arc::clone(&session),
                writer,
            },
        );

        if let Err(e) = self.channel.connected(&session).await {
            self.server.registry().remove(session.id());
            self.clients.write().remove(&id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes a client: the channel's `disconnected` hook runs, then the
    /// session leaves the registry and is closed.
    pub async fn remove_client(&self, id: u64) -> TestResult<()> {
        let session = self.session(id)?;
        let result = self.channel.disconnected(&session).await;
        self.server.registry().remove(session.id());
        if let Some(rooms) = self.channel.room_manager() {
            rooms.room_client_quit(&session).await;
        }
        session.close().await?;
        result.map_err(TestError::from)
    }

    /// The session of a client.
    pub fn session(&self, id: u64) -> TestResult<Arc<Session>> {
        self.clients
            .read()
            .get(&id)
            .map(|c| Arc::clone(&c.session))
            .ok_or(TestError::UnknownClient(id))
    }

    /// What the server sent to a client.
    pub fn client(&self, id: u64) -> TestResult<Arc<RecordingWriter>> {
        self.clients
            .read()
            .get(&id)
            .map(|c| Arc::clone(&c.writer))
            .ok_or(TestError::UnknownClient(id))
    }

    /// A handler context for a client.
    pub fn context(&self, id: u64) -> TestResult<Context> {
        Ok(Context::new(self.server.clone(), self.session(id)?))
    }

    /// Sends `event` from a client on the channel's alias, through the
    /// server's routing.
    pub async fn dispatch<T: Event>(&self, id: u64, event: &T) -> TestResult<()> {
        let body = serde_json::to_value(event)
            .map_err(|e| courier_core::CoreError::encode(T::NAME, e))?;
        let envelope = Envelope::new(self.channel.alias(), T::ALIAS, body);
        let raw = envelope.encode(self.server.codec())?;
        let ctx = self.context(id)?;
        self.server.process_event(&ctx, &raw).await?;
        Ok(())
    }

    /// Whether a client received an event equal to `event`.
    pub fn has_event<T: Event + PartialEq>(&self, id: u64, event: &T) -> bool {
        self.client(id).is_ok_and(|writer| writer.has_event(event))
    }

    /// Forgets what every client received so far.
    pub fn clear_recorded(&self) {
        for client in self.clients.read().values() {
            client.writer.clear();
        }
    }
}
