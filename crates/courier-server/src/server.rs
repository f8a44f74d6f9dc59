//! The server orchestrator.
//!
//! [`Server`] owns the registered channels and the client registry, and
//! drives each connection through its lifecycle:
//!
//! 1. **Authenticating**: every channel with a basic-auth capability
//!    challenges the connection in turn. Any failure rejects it.
//! 2. **Admitting**: every channel's `connected` hook runs; an error
//!    rejects the connection. The session then enters the registry and
//!    presence is announced on channels without a connection manager.
//! 3. **Routing**: inbound envelopes are dispatched to their channel until
//!    the transport fails or the server shuts down. Handler errors go back
//!    to the client on the `errors` channel.
//! 4. **Closed**: the session leaves the registry, `disconnected` hooks
//!    run, authentication is revoked, presence is withdrawn and the
//!    session leaves its rooms. Teardown failures are logged.

use std::sync::{Arc, Weak};

use courier_core::protocol::RoomRequest;
use courier_core::{Codec, CoreError, Envelope, Event, JsonCodec};
use courier_telemetry::logging::session_span;
use courier_telemetry::metrics::{record_connection, record_event, ActiveSessionGuard, ConnectionOutcome};
use courier_ws::{Connection, ConnectionReader, ConnectionWriter};
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Instrument};

use crate::broadcast::broadcast;
use crate::channel::Channel;
use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::{CourierError, Result};
use crate::registry::ClientRegistry;
use crate::session::{Session, SessionId};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

struct ServerInner {
    config: ServerConfig,
    codec: Arc<dyn Codec>,
    registry: ClientRegistry,
    channels: RwLock<Vec<Arc<dyn Channel>>>,
    shutdown: ShutdownSignal,
}

/// A channel server. Cheap to clone; clones share all state.
///
/// # Example
///
/// ```rust,no_run
/// use courier_server::{Server, ServerConfig};
///
/// # async fn run() -> courier_server::Result<()> {
/// let server = Server::new(ServerConfig::builder().bind_addr("127.0.0.1:3000").build());
/// // server.register(my_channel)?;
/// server.run().await
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

/// A non-owning handle to a [`Server`], held by channels.
#[derive(Clone)]
pub struct WeakServer {
    inner: Weak<ServerInner>,
}

impl WeakServer {
    /// The server, if it is still alive.
    pub fn upgrade(&self) -> Option<Server> {
        self.inner.upgrade().map(|inner| Server { inner })
    }
}

impl std::fmt::Debug for WeakServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakServer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Server {
    /// Creates a server with the JSON codec.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_codec(config, Arc::new(JsonCodec))
    }

    /// Creates a server with a custom codec.
    pub fn with_codec(config: ServerConfig, codec: Arc<dyn Codec>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                codec,
                registry: ClientRegistry::new(),
                channels: RwLock::new(Vec::new()),
                shutdown: ShutdownSignal::new(),
            }),
        }
    }

    /// A non-owning handle.
    pub fn downgrade(&self) -> WeakServer {
        WeakServer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The codec used on every connection.
    pub fn codec(&self) -> &dyn Codec {
        self.inner.codec.as_ref()
    }

    /// Registers a channel.
    ///
    /// Binds the channel (and its room manager) to this server and wires
    /// its receiver. Fails if the alias is taken.
    pub fn register(&self, channel: Arc<dyn Channel>) -> Result<()> {
        let alias = channel.alias().to_string();
        let mut channels = self.inner.channels.write();
        if channels.iter().any(|c| c.alias() == alias) {
            return Err(CourierError::DuplicateChannel { alias });
        }

        channel.bind(self)?;
        if let Some(rooms) = channel.room_manager() {
            rooms.bind(&alias, self)?;
        }
        Arc::clone(&channel).set_receiver();
        info!(channel = %channel.name(), alias = %alias, "Channel registered");
        channels.push(channel);
        Ok(())
    }

    /// The channel registered under `alias`.
    pub fn channel(&self, alias: &str) -> Option<Arc<dyn Channel>> {
        self.inner
            .channels
            .read()
            .iter()
            .find(|c| c.alias() == alias)
            .cloned()
    }

    /// Every registered channel, in registration order.
    pub fn channels(&self) -> Vec<Arc<dyn Channel>> {
        self.inner.channels.read().clone()
    }

    /// The client registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.inner.registry
    }

    /// Every admitted session except the excluded ids.
    pub fn clients(&self, exclude: &[SessionId]) -> Vec<Arc<Session>> {
        self.inner.registry.list(exclude)
    }

    /// Looks up an admitted session.
    pub fn client(&self, id: SessionId) -> Option<Arc<Session>> {
        self.inner.registry.get(id)
    }

    /// Sends an event on `channel` to every admitted session except the
    /// excluded ids.
    pub async fn broadcast<T: Event>(&self, channel: &str, event: &T, exclude: &[SessionId]) -> Result<()> {
        broadcast(channel, event, &self.clients(exclude)).await
    }

    /// Creates a session for a connection's writer with a fresh id.
    pub fn new_session(&self, writer: Arc<dyn ConnectionWriter>) -> Arc<Session> {
        Arc::new(Session::new(
            self.inner.registry.next_id(),
            writer,
            Arc::clone(&self.inner.codec),
        ))
    }

    /// The signal that stops the accept loop and every routing loop.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.clone()
    }

    /// Triggers graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.inner.shutdown.trigger();
    }

    /// Decodes one inbound message and dispatches it.
    ///
    /// Room requests on a channel with a room manager are handled by the
    /// manager; everything else goes to the channel's router.
    pub async fn process_event(&self, ctx: &Context, raw: &[u8]) -> Result<()> {
        let envelope = Envelope::decode(self.codec(), raw)?;
        if envelope.channel.is_empty() {
            return Err(CoreError::EmptyChannel.into());
        }
        if envelope.name.is_empty() {
            return Err(CoreError::EmptyEventName.into());
        }
        let channel = self
            .channel(&envelope.channel)
            .ok_or_else(|| CourierError::UnknownChannel(envelope.channel.clone()))?;

        let result = match channel.room_manager() {
            Some(rooms) if RoomRequest::is_room_event(&envelope.name) => {
                match RoomRequest::decode(envelope) {
                    Ok(request) => rooms.on_room_event(ctx.session(), request).await,
                    Err(e) => Err(e.into()),
                }
            }
            _ => channel.route(ctx, envelope).await,
        };
        record_event(channel.alias(), result.is_ok());
        result
    }

    /// Runs one connection through its whole lifecycle.
    pub async fn handle_connection<C: Connection>(&self, connection: C) {
        let (mut reader, writer) = connection.into_split();
        let session = self.new_session(writer);
        let span = session_span(session.id().get());
        self.drive(session, reader.as_mut()).instrument(span).await;
    }

    async fn drive(&self, session: Arc<Session>, reader: &mut dyn ConnectionReader) {
        let ctx = Context::new(self.clone(), Arc::clone(&session));
        debug!("Connection accepted");

        if let Err(e) = self.check_auth(&ctx, reader).await {
            warn!(error = %e, "Authentication failed, rejecting connection");
            self.reject(&session, &e).await;
            return;
        }

        if let Err(e) = self.admit(&session).await {
            warn!(error = %e, "Admission refused");
            self.reject(&session, &e).await;
            return;
        }

        self.inner.registry.add(Arc::clone(&session));
        record_connection(ConnectionOutcome::Admitted);
        let _active = ActiveSessionGuard::new();
        info!(user_id = %session.identity(), "Session admitted");

        for channel in self.channels() {
            if channel.connection_manager().is_some() {
                continue;
            }
            if let Some(presence) = channel.presence() {
                if let Err(e) = presence.on_join(self, channel.as_ref(), &session, true).await {
                    warn!(channel = %channel.alias(), error = %e, "Presence join failed");
                }
            }
        }

        self.route_until_closed(&ctx, reader).await;
        self.teardown(&session).await;
    }

    async fn admit(&self, session: &Arc<Session>) -> Result<()> {
        for channel in self.channels() {
            channel
                .connected(session)
                .await
                .map_err(|e| CourierError::connect(channel.name(), e))?;
        }
        Ok(())
    }

    async fn reject(&self, session: &Arc<Session>, reason: &CourierError) {
        record_connection(ConnectionOutcome::Rejected);
        if let Err(e) = session.send_error(reason.to_string()).await {
            debug!(error = %e, "Could not report rejection");
        }
        if let Err(e) = self.revoke_auth(session).await {
            warn!(error = %e, "Revoking authentication failed");
        }
        if let Err(e) = session.close().await {
            debug!(error = %e, "Close after rejection failed");
        }
    }

    async fn route_until_closed(&self, ctx: &Context, reader: &mut dyn ConnectionReader) {
        let shutdown = self.shutdown_signal();
        loop {
            let raw = tokio::select! {
                result = reader.read_message() => result,
                () = shutdown.recv() => {
                    debug!("Routing stopped by shutdown");
                    return;
                }
            };

            match raw {
                Ok(bytes) => {
                    if let Err(e) = self.process_event(ctx, &bytes).await {
                        warn!(error = %e, "Error while processing event");
                        let message = format!("error while processing event: {e}");
                        if let Err(send_err) = ctx.session().send_error(message).await {
                            debug!(error = %send_err, "Could not report routing error");
                        }
                    }
                }
                Err(e) if e.is_closed() => {
                    debug!("Transport closed");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Transport read failed");
                    return;
                }
            }
        }
    }

    async fn teardown(&self, session: &Arc<Session>) {
        session.mark_closed();
        self.inner.registry.remove(session.id());
        let channels = self.channels();

        for channel in &channels {
            if let Err(e) = channel.disconnected(session).await {
                warn!(channel = %channel.alias(), error = %e, "Disconnected hook failed");
            }
        }

        if let Err(e) = self.revoke_auth(session).await {
            warn!(error = %e, "Revoking authentication failed");
        }

        for channel in &channels {
            if channel.connection_manager().is_some() {
                continue;
            }
            if let Some(presence) = channel.presence() {
                if let Err(e) = presence.on_left(self, channel.as_ref(), session).await {
                    warn!(channel = %channel.alias(), error = %e, "Presence left failed");
                }
            }
        }

        for channel in &channels {
            if let Some(rooms) = channel.room_manager() {
                rooms.room_client_quit(session).await;
            }
        }

        if let Err(e) = session.close().await {
            debug!(error = %e, "Close during teardown failed");
        }
        info!("Session closed");
    }

    /// Accepts WebSocket connections on `listener` until shutdown, then
    /// waits up to the configured timeout for sessions to finish.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, path = %self.config().path(), "Courier server listening");

        let tracker = ConnectionTracker::new();
        let shutdown = self.shutdown_signal();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let server = self.clone();
                        let token = tracker.acquire();
                        tokio::spawn(async move {
                            match courier_ws::accept(stream, server.config().websocket()).await {
                                Ok(socket) => server.handle_connection(socket).await,
                                Err(e) => debug!(%remote_addr, error = %e, "WebSocket handshake failed"),
                            }
                            drop(token);
                        });
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let timeout = self.config().shutdown_timeout();
        info!(
            "Waiting up to {:?} for {} sessions to close",
            timeout,
            tracker.active_connections()
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => info!("All sessions closed"),
            () = tokio::time::sleep(timeout) => warn!(
                "Shutdown timeout reached, {} sessions still active",
                tracker.active_connections()
            ),
        }

        info!("Server stopped");
        Ok(())
    }

    /// Binds the configured address and serves until SIGINT, SIGTERM or
    /// [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<()> {
        let addr = self.config().socket_addr().map_err(|e| {
            CourierError::Bind(format!("invalid address '{}': {}", self.config().bind_addr(), e))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CourierError::Bind(format!("failed to bind to {addr}: {e}")))?;

        self.inner.shutdown.trigger_on_os_signal();
        self.serve(listener).await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let aliases: Vec<String> = self
            .inner
            .channels
            .read()
            .iter()
            .map(|c| c.alias().to_string())
            .collect();
        f.debug_struct("Server")
            .field("config", &self.inner.config)
            .field("codec", &self.inner.codec.name())
            .field("channels", &aliases)
            .field("clients", &self.inner.registry.len())
            .finish()
    }
}
