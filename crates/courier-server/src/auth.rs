//! The per-connection authentication handshake.
//!
//! Before a session is admitted, each channel with a basic-auth capability
//! sends `edd:auth:challenge` and waits for the next message, which must be
//! an `edd:auth:basic` answer on that same channel. A passed challenge
//! records the authentication, confirms it with `edd:auth:pass` and, on
//! channels with a connection manager, tracks the user and announces it on
//! the user's first session. The first failure rejects the connection.

use std::sync::Arc;

use courier_core::protocol::{AuthChallenge, AuthPass, BasicAuth};
use courier_core::{AuthMethod, CoreError, Envelope, Event};
use courier_telemetry::metrics::record_auth_attempt;
use courier_ws::ConnectionReader;
use tracing::{debug, info, instrument, warn};

use crate::channel::Channel;
use crate::conn_manager::Departure;
use crate::context::Context;
use crate::error::{AuthError, CourierError, Result};
use crate::server::Server;
use crate::session::Session;

impl Server {
    /// Challenges the connection on every auth-gated channel, in
    /// registration order.
    ///
    /// Waiting for an answer ends early with
    /// [`CourierError::ShuttingDown`] once the server stops.
    pub async fn check_auth(&self, ctx: &Context, reader: &mut dyn ConnectionReader) -> Result<()> {
        let shutdown = self.shutdown_signal();
        for channel in self.channels() {
            if channel.basic_auth().is_none() {
                continue;
            }
            let alias = channel.alias();
            let challenge = AuthChallenge {
                methods: vec![AuthMethod::Basic.as_str().to_string()],
            };
            ctx.session().send(alias, &challenge).await?;
            debug!(channel = %alias, "Auth challenge sent");

            let raw = tokio::select! {
                result = reader.read_message() => result?,
                () = shutdown.recv() => {
                    debug!(channel = %alias, "Auth challenge abandoned by shutdown");
                    return Err(CourierError::ShuttingDown);
                }
            };
            let result = self.process_event_auth(ctx, channel.as_ref(), &raw).await;
            record_auth_attempt(alias, result.is_ok());
            result?;
        }
        Ok(())
    }

    /// Handles the answer to `channel`'s challenge.
    #[instrument(skip_all, fields(channel = %channel.alias()))]
    pub async fn process_event_auth(&self, ctx: &Context, channel: &dyn Channel, raw: &[u8]) -> Result<()> {
        let envelope = Envelope::decode(self.codec(), raw)?;
        if envelope.channel.is_empty() {
            return Err(CoreError::EmptyChannel.into());
        }

        let alias = channel.alias();
        if envelope.channel != alias {
            if self.channel(&envelope.channel).is_none() {
                return Err(CourierError::UnknownChannel(envelope.channel));
            }
            return Err(AuthError::ChannelMismatch {
                expected: alias.to_string(),
                got: envelope.channel,
            }
            .into());
        }

        let authenticator = match channel.basic_auth() {
            Some(authenticator) if envelope.name == BasicAuth::ALIAS => authenticator,
            _ => return Err(AuthError::UnsupportedMethod(envelope.name).into()),
        };
        let credentials: BasicAuth = envelope.into_event()?;
        let username = credentials.username.clone();

        let auth = match authenticator.on_basic_auth(ctx, credentials).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!(user = %username, error = %e, "Authentication rejected");
                return Err(AuthError::Rejected {
                    channel: alias.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let session = ctx.session();
        session.set_auth(auth)?;
        let user_id = session.identity();
        info!(user_id = %user_id, "Authentication passed");

        // Tracked before the pass is sent, so a client that saw its pass
        // is visible to the next one's catch-up.
        let first = channel
            .connection_manager()
            .map(|manager| manager.set_auth(session));
        session.send(alias, &AuthPass { id: user_id }).await?;

        if let (Some(first), Some(presence)) = (first, channel.presence()) {
            presence.on_join(self, channel, session, first).await?;
        }
        Ok(())
    }

    /// Withdraws the session from every connection manager, announcing
    /// users whose last session this was.
    ///
    /// Every channel is processed; the first error is returned.
    pub async fn revoke_auth(&self, session: &Arc<Session>) -> Result<()> {
        let mut first_error = None;
        for channel in self.channels() {
            let Some(manager) = channel.connection_manager() else {
                continue;
            };
            match manager.remove_auth(session.id()) {
                Departure::LastConnection => {
                    if let Some(presence) = channel.presence() {
                        if let Err(e) = presence.on_left(self, channel.as_ref(), session).await {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                Departure::StillConnected | Departure::NotTracked => {}
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
