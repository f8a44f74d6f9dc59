//! User join/left announcements.
//!
//! Without a [`ConnectionManager`](crate::ConnectionManager) presence is per
//! connection and targets every other admitted session. With one, presence
//! is per user and targets the other users' sessions from the manager's
//! index; the server then only calls in on a user's first and last session.

use std::sync::Arc;

use courier_core::protocol::{UserJoin, UserLeft};
use courier_core::Event;
use tracing::debug;

use crate::broadcast::broadcast;
use crate::channel::Channel;
use crate::error::Result;
use crate::server::Server;
use crate::session::Session;

/// Presence capability a channel embeds and returns from
/// [`Channel::presence`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UserPresence;

impl UserPresence {
    /// Creates the capability.
    pub fn new() -> Self {
        Self
    }

    /// Tells `session` who is already present, then, if `announce` is set,
    /// tells everyone else about `session`.
    pub async fn on_join(
        &self,
        server: &Server,
        channel: &dyn Channel,
        session: &Arc<Session>,
        announce: bool,
    ) -> Result<()> {
        let alias = channel.alias();
        let identity = session.identity();

        let present = match channel.connection_manager() {
            Some(manager) => manager.authorized_user_ids(&[identity.as_str()]),
            None => server
                .clients(&[session.id()])
                .iter()
                .map(|other| other.identity())
                .collect(),
        };
        for id in present {
            session.send(alias, &UserJoin { id }).await?;
        }

        if announce {
            debug!(channel = %alias, user_id = %identity, "Announcing user join");
            let event = UserJoin { id: identity };
            self.announce(server, channel, session, &event).await?;
        }
        Ok(())
    }

    /// Tells everyone else that `session` left.
    pub async fn on_left(&self, server: &Server, channel: &dyn Channel, session: &Arc<Session>) -> Result<()> {
        let identity = session.identity();
        debug!(channel = %channel.alias(), user_id = %identity, "Announcing user left");
        let event = UserLeft { id: identity };
        self.announce(server, channel, session, &event).await
    }

    async fn announce<T: Event>(
        &self,
        server: &Server,
        channel: &dyn Channel,
        session: &Arc<Session>,
        event: &T,
    ) -> Result<()> {
        let targets = match channel.connection_manager() {
            Some(manager) => manager.authorized_user_clients(&[session.identity().as_str()]),
            None => server.clients(&[session.id()]),
        };
        broadcast(channel.alias(), event, &targets).await
    }
}
