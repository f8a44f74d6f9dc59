//! # Courier Server
//!
//! The connection lifecycle and routing core of Courier.
//!
//! A [`Server`] hosts [`Channel`]s. Each accepted connection becomes a
//! [`Session`] that is authenticated on auth-gated channels, admitted by
//! every channel's `connected` hook, placed in the [`ClientRegistry`] and
//! then routed: each inbound [`Envelope`](courier_core::Envelope) is handed
//! to the channel named in it.
//!
//! Channels opt into extra behaviour by returning helpers from their
//! capability methods:
//!
//! - [`BasicAuthenticator`]: username/password challenge before admission
//! - [`ConnectionManager`]: per-user session index for user-level presence
//! - [`UserPresence`]: `edd:user:join` / `edd:user:left` announcements
//! - [`RoomManager`]: rooms and the `edd:room:*` client protocol
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use courier_core::{Envelope, NoEvents};
//! use courier_server::{Channel, ChannelBase, Context, Result, Server, ServerConfig, UserPresence};
//!
//! struct Lobby {
//!     base: ChannelBase<NoEvents>,
//!     presence: UserPresence,
//! }
//!
//! #[async_trait]
//! impl Channel for Lobby {
//!     fn name(&self) -> &str {
//!         self.base.name()
//!     }
//!
//!     fn bind(&self, server: &Server) -> Result<()> {
//!         self.base.bind(server)
//!     }
//!
//!     async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
//!         self.base.route(ctx, envelope).await
//!     }
//!
//!     fn presence(&self) -> Option<&UserPresence> {
//!         Some(&self.presence)
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let server = Server::new(ServerConfig::default());
//! server.register(Arc::new(Lobby {
//!     base: ChannelBase::new("lobby"),
//!     presence: UserPresence::new(),
//! }))?;
//! server.run().await
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/courier-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
pub mod broadcast;
pub mod channel;
pub mod config;
pub mod conn_manager;
pub mod context;
pub mod error;
pub mod presence;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use broadcast::{broadcast, broadcast_envelope};
pub use channel::{BasicAuthenticator, Channel, ChannelBase, Receiver};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use conn_manager::{ConnectionManager, Departure};
pub use context::Context;
pub use error::{AuthError, BroadcastError, BroadcastFailure, CourierError, Result, RoomError};
pub use presence::UserPresence;
pub use registry::ClientRegistry;
pub use room::{Room, RoomManager};
pub use server::{Server, WeakServer};
pub use session::{Session, SessionId};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
