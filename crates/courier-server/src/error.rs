//! Error types for the server.
//!
//! [`CourierError`] is what handlers, channels and the orchestrator
//! return. Authentication, room and broadcast failures keep their own
//! types so callers can match on them.

use std::fmt;

use courier_core::CoreError;
use courier_ws::WsError;
use thiserror::Error;

use crate::session::SessionId;

/// Result type used throughout the server.
pub type Result<T, E = CourierError> = std::result::Result<T, E>;

/// Errors raised by the server, its channels and their handlers.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Envelope or payload codec failure, missing handler, direction violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The connection failed underneath the session.
    #[error(transparent)]
    Transport(#[from] WsError),

    /// Another channel already uses this alias.
    #[error("channel alias '{alias}' is already registered")]
    DuplicateChannel {
        /// The conflicting alias.
        alias: String,
    },

    /// No channel is registered under this alias.
    #[error("unknown channel {0}")]
    UnknownChannel(String),

    /// The channel has not been registered with a server yet.
    #[error("channel {0} is not bound to a server")]
    NotBound(String),

    /// The channel was already registered with a server.
    #[error("channel {0} is already bound to a server")]
    AlreadyBound(String),

    /// The server a channel was bound to has been dropped.
    #[error("server is no longer running")]
    ServerGone,

    /// The server stopped while the connection was being set up.
    #[error("server is shutting down")]
    ShuttingDown,

    /// A channel routed an event before a receiver was set.
    #[error("no receiver set on channel {0}")]
    NoReceiver(String),

    /// Authentication handshake failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Room protocol failure.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// One or more targets of a broadcast failed.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// The session was closed before the write.
    #[error("writing to closed client {0}")]
    ClientClosed(SessionId),

    /// A channel's connected hook refused the session.
    #[error("error while connecting on {channel}: {source}")]
    Connect {
        /// Name of the refusing channel.
        channel: String,
        /// The hook's error.
        source: Box<CourierError>,
    },

    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O error from the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A handler rejected an event.
    #[error("{0}")]
    Handler(String),

    /// Any other application error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CourierError {
    /// Creates a handler error with a message for the client.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Wraps a connected-hook failure.
    pub fn connect(channel: impl Into<String>, source: CourierError) -> Self {
        Self::Connect {
            channel: channel.into(),
            source: Box::new(source),
        }
    }

    /// Returns `true` for errors that prevent a connection from being admitted.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Connect { .. } | Self::ShuttingDown | Self::Bind(_) | Self::Io(_) => true,
            Self::Transport(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Failures of the per-channel authentication handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The answer arrived on a different channel than the challenge.
    #[error("auth answer on channel {got}, expected {expected}")]
    ChannelMismatch {
        /// Channel that issued the challenge.
        expected: String,
        /// Channel named in the answer.
        got: String,
    },

    /// The answer used a method the channel does not offer.
    #[error("unsupported auth method {0}")]
    UnsupportedMethod(String),

    /// The channel's authenticator refused the credentials.
    #[error("authentication rejected on {channel}: {reason}")]
    Rejected {
        /// Channel alias.
        channel: String,
        /// The authenticator's error message.
        reason: String,
    },

    /// A second channel authenticated the session as a different user.
    #[error("session {session} is already authenticated as {current}")]
    IdentityConflict {
        /// The session.
        session: SessionId,
        /// The user id already recorded.
        current: String,
    },
}

/// Structural room failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// No room with this id.
    #[error("unknown room {0}")]
    UnknownRoom(String),

    /// A room with this id already exists.
    #[error("room {0} already exists")]
    DuplicateRoom(String),

    /// The session is already in the room.
    #[error("client is already in room {room}")]
    AlreadyMember {
        /// Room id.
        room: String,
    },

    /// The session is not in the room.
    #[error("client is not in room {room}")]
    NotMember {
        /// Room id.
        room: String,
    },

    /// Multi-room mode limit reached.
    #[error("limit of joinable rooms reached ({limit})")]
    LimitReached {
        /// Configured rooms-per-user limit.
        limit: usize,
    },

    /// The manager's channel has not been registered yet.
    #[error("room manager is not bound to a channel")]
    NotBound,
}

/// One failed target of a broadcast.
#[derive(Debug)]
pub struct BroadcastFailure {
    /// The target session.
    pub session: SessionId,
    /// Why the send failed.
    pub error: CourierError,
}

/// Every failed target of one broadcast. Delivery to the others is not
/// rolled back.
#[derive(Debug)]
pub struct BroadcastError {
    /// Failed targets, in target order.
    pub failures: Vec<BroadcastFailure>,
}

impl BroadcastError {
    /// Ids of the sessions that did not receive the event.
    pub fn failed_sessions(&self) -> Vec<SessionId> {
        self.failures.iter().map(|f| f.session).collect()
    }
}

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) occurred while broadcasting:",
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n\tclient {}: {}", failure.session, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BroadcastError {}
