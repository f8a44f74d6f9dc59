//! # Courier
//!
//! **Channel-based event server over WebSocket**
//!
//! Clients exchange JSON envelopes `{channel, name, body}` with the server.
//! Each channel is a routing endpoint with optional capabilities:
//!
//! - **Basic auth**: challenge, credentials, pass or reject before admission
//! - **Connection manager**: index of authenticated users and their sessions
//! - **Presence**: `edd:user:join` / `edd:user:left` announcements with
//!   catch-up for newcomers
//! - **Rooms**: create, join and leave rooms with membership announcements
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! inbound_events! {
//!     pub enum EchoEvents { Say(Say) }
//! }
//!
//! struct Echo { base: ChannelBase<EchoEvents> }
//!
//! #[async_trait]
//! impl Receiver<EchoEvents> for Echo {
//!     async fn receive(&self, ctx: &Context, event: EchoEvents) -> Result<()> {
//!         let EchoEvents::Say(say) = event;
//!         self.base.send(ctx.session(), &say).await
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (_config, server) = courier::bootstrap_from_env()?;
//!     server.register(Arc::new(Echo { base: ChannelBase::new("echo") }))?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection lifecycle
//!
//! ```text
//! accept → auth challenges → connected hooks → registry + presence
//!        → route events until close → teardown (hooks, presence, rooms)
//! ```

#![doc(html_root_url = "https://docs.rs/courier/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;

pub use bootstrap::{bootstrap, bootstrap_from_env, server_config, telemetry_config, BootstrapError};

// Re-export envelope, event and codec types
pub use courier_core as core;

// Re-export the connection layer
pub use courier_ws as ws;

// Re-export server types
pub use courier_server as server;

// Re-export configuration
pub use courier_config as config;

// Re-export telemetry
pub use courier_telemetry as telemetry;

// Channel implementations need the attribute.
pub use async_trait::async_trait;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use async_trait::async_trait;

    pub use courier_core::protocol::{
        AuthChallenge, AuthPass, BasicAuth, RoomCreate, RoomCreateRequest, RoomJoin,
        RoomJoinRequest, RoomLeft, RoomLeftRequest, UserJoin, UserLeft,
    };
    pub use courier_core::{
        inbound_events, Authentication, Codec, CoreError, Envelope, Event, InboundEvents,
        JsonCodec,
    };

    pub use courier_server::{
        BasicAuthenticator, Channel, ChannelBase, ConnectionManager, Context, CourierError,
        Receiver, Result, Room, RoomManager, Server, ServerConfig, Session, SessionId,
        UserPresence,
    };

    pub use courier_config::{ConfigLoader, CourierConfig};
}
