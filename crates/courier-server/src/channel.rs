//! Channels and event routing.
//!
//! A [`Channel`] is a named routing endpoint. Optional behaviour (connect
//! hooks, basic auth, a connection manager, rooms, presence) is exposed
//! through capability methods that default to "not provided"; a channel
//! opts in by embedding the helper and returning it.
//!
//! [`ChannelBase`] is the composition helper most channels embed. It holds
//! the server binding and a weak reference to the [`Receiver`] that handles
//! the channel's decoded [`InboundEvents`].
//!
//! ```rust,ignore
//! courier_core::inbound_events! {
//!     pub enum PingEvents { Ping(Ping), Pong(Pong) }
//! }
//!
//! struct PingChannel {
//!     base: ChannelBase<PingEvents>,
//! }
//!
//! #[async_trait]
//! impl Receiver<PingEvents> for PingChannel {
//!     async fn receive(&self, ctx: &Context, event: PingEvents) -> Result<()> {
//!         match event {
//!             PingEvents::Ping(ping) => self.base.send(ctx.session(), &Pong { id: ping.id }).await,
//!             PingEvents::Pong(_) => Ok(()),
//!         }
//!     }
//! }
//!
//! #[async_trait]
//! impl Channel for PingChannel {
//!     fn name(&self) -> &str {
//!         self.base.name()
//!     }
//!
//!     fn bind(&self, server: &Server) -> Result<()> {
//!         self.base.bind(server)
//!     }
//!
//!     fn set_receiver(self: Arc<Self>) {
//!         // Unsizes to the trait object at its own binding.
//!         let weak = Arc::downgrade(&self);
//!         let receiver: Weak<dyn Receiver<PingEvents>> = weak;
//!         self.base.set_receiver(receiver);
//!     }
//!
//!     async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
//!         self.base.route(ctx, envelope).await
//!     }
//! }
//! ```

use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use courier_core::protocol::BasicAuth;
use courier_core::{Authentication, Envelope, Event, InboundEvents};
use parking_lot::RwLock;

use crate::broadcast::broadcast;
use crate::conn_manager::ConnectionManager;
use crate::context::Context;
use crate::error::{CourierError, Result};
use crate::presence::UserPresence;
use crate::room::RoomManager;
use crate::server::{Server, WeakServer};
use crate::session::Session;

/// Answers `edd:auth:basic` credentials for a channel.
#[async_trait]
pub trait BasicAuthenticator: Send + Sync {
    /// Validates the credentials and returns the session's authentication.
    ///
    /// Any error rejects the connection.
    async fn on_basic_auth(&self, ctx: &Context, credentials: BasicAuth) -> Result<Authentication>;
}

/// Handles a channel's decoded inbound events.
#[async_trait]
pub trait Receiver<E: Send + 'static>: Send + Sync + 'static {
    /// Handles one event from `ctx.session()`.
    async fn receive(&self, ctx: &Context, event: E) -> Result<()>;
}

/// A registered routing endpoint.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Internal name, used in logs and admission errors.
    fn name(&self) -> &str;

    /// Wire identifier. Unique among a server's channels.
    fn alias(&self) -> &str {
        self.name()
    }

    /// Attaches the server. Called once by [`Server::register`].
    fn bind(&self, server: &Server) -> Result<()>;

    /// Wires the channel's receiver once it is shared.
    fn set_receiver(self: Arc<Self>) {}

    /// Decodes `envelope` and dispatches it.
    async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()>;

    /// Runs before a session is admitted. An error refuses the session.
    async fn connected(&self, _session: &Arc<Session>) -> Result<()> {
        Ok(())
    }

    /// Runs during teardown. Errors are logged.
    async fn disconnected(&self, _session: &Arc<Session>) -> Result<()> {
        Ok(())
    }

    /// Basic-auth capability.
    fn basic_auth(&self) -> Option<&dyn BasicAuthenticator> {
        None
    }

    /// Authenticated user index capability.
    fn connection_manager(&self) -> Option<&ConnectionManager> {
        None
    }

    /// Room capability.
    fn room_manager(&self) -> Option<&RoomManager> {
        None
    }

    /// User join/left presence capability.
    fn presence(&self) -> Option<&UserPresence> {
        None
    }
}

/// Server binding and receiver slot shared by channel implementations.
pub struct ChannelBase<E: InboundEvents> {
    name: String,
    alias: String,
    server: OnceLock<WeakServer>,
    receiver: RwLock<Option<Weak<dyn Receiver<E>>>>,
}

impl<E: InboundEvents> ChannelBase<E> {
    /// Creates a base whose alias equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_alias(name.clone(), name)
    }

    /// Creates a base with a distinct wire alias.
    pub fn with_alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            server: OnceLock::new(),
            receiver: RwLock::new(None),
        }
    }

    /// Internal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Attaches the server. Binding twice is an error.
    pub fn bind(&self, server: &Server) -> Result<()> {
        self.server
            .set(server.downgrade())
            .map_err(|_| CourierError::AlreadyBound(self.name.clone()))
    }

    /// Whether [`bind`](Self::bind) has been called.
    pub fn is_bound(&self) -> bool {
        self.server.get().is_some()
    }

    /// The bound server.
    pub fn server(&self) -> Result<Server> {
        self.server
            .get()
            .ok_or_else(|| CourierError::NotBound(self.name.clone()))?
            .upgrade()
            .ok_or(CourierError::ServerGone)
    }

    /// Replaces the receiver. Tests use this to substitute a double while
    /// keeping the channel's routing.
    pub fn set_receiver(&self, receiver: Weak<dyn Receiver<E>>) {
        *self.receiver.write() = Some(receiver);
    }

    /// Decodes the envelope into `E` and hands it to the receiver.
    pub async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
        let event = E::decode_envelope(&self.name, envelope)?;
        let receiver = self
            .receiver
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| CourierError::NoReceiver(self.name.clone()))?;
        receiver.receive(ctx, event).await
    }

    /// Sends an event to one session on this channel.
    pub async fn send<T: Event>(&self, session: &Session, event: &T) -> Result<()> {
        session.send(&self.alias, event).await
    }

    /// Sends an event to every target on this channel.
    pub async fn broadcast<T: Event>(&self, targets: &[Arc<Session>], event: &T) -> Result<()> {
        broadcast(&self.alias, event, targets).await
    }
}

impl<E: InboundEvents> std::fmt::Debug for ChannelBase<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBase")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}
