//! Reserved protocol events.
//!
//! These events are understood by every server regardless of the channels
//! it hosts: the authentication handshake, user presence and rooms, plus
//! the `errors` channel used to report recoverable failures.
//!
//! | Event | Direction | Body |
//! |-------|-----------|------|
//! | `edd:auth:challenge` | server → client | `{methods}` |
//! | `edd:auth:basic` | client → server | `{username, password}` |
//! | `edd:auth:pass` | server → client | `{id}` |
//! | `edd:user:join` / `edd:user:left` | server → client | `{id}` |
//! | `edd:room:create_request` | client → server | `{room, public}` |
//! | `edd:room:join_request` / `edd:room:left_request` | client → server | `{room}` |
//! | `edd:room:create` | server → client | `{room}` |
//! | `edd:room:join` / `edd:room:left` | server → client | `{id, room}` |

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult};
use crate::event::Event;

/// Channel carrying recoverable error reports.
pub const ERROR_CHANNEL: &str = "errors";

/// Event name used on [`ERROR_CHANNEL`].
pub const ERROR_EVENT: &str = "error";

/// Prefix shared by all room events.
pub const ROOM_EVENT_PREFIX: &str = "edd:room:";

/// Sent on each auth-gated channel when a connection is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthChallenge {
    /// Supported methods, named by their event alias.
    pub methods: Vec<String>,
}

impl Event for AuthChallenge {
    const NAME: &'static str = "edd:auth:challenge";
}

/// Username/password credentials answering a challenge.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Event for BasicAuth {
    const NAME: &'static str = "edd:auth:basic";
}

/// Confirms a passed challenge with the authenticated user id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthPass {
    /// Authenticated user id.
    pub id: String,
}

impl Event for AuthPass {
    const NAME: &'static str = "edd:auth:pass";
}

/// A user became present on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserJoin {
    /// User identity.
    pub id: String,
}

impl Event for UserJoin {
    const NAME: &'static str = "edd:user:join";
}

/// A user is no longer present on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserLeft {
    /// User identity.
    pub id: String,
}

impl Event for UserLeft {
    const NAME: &'static str = "edd:user:left";
}

/// Client asks to create a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomCreateRequest {
    /// Room id.
    pub room: String,
    /// Whether the room is announced to everyone.
    #[serde(default)]
    pub public: bool,
}

impl Event for RoomCreateRequest {
    const NAME: &'static str = "edd:room:create_request";
}

/// Client asks to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomJoinRequest {
    /// Room id.
    pub room: String,
}

impl Event for RoomJoinRequest {
    const NAME: &'static str = "edd:room:join_request";
}

/// Client asks to leave a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomLeftRequest {
    /// Room id.
    pub room: String,
}

impl Event for RoomLeftRequest {
    const NAME: &'static str = "edd:room:left_request";
}

/// A room exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomCreate {
    /// Room id.
    pub room: String,
}

impl Event for RoomCreate {
    const NAME: &'static str = "edd:room:create";
}

/// A member is in a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomJoin {
    /// Member identity.
    pub id: String,
    /// Room id.
    pub room: String,
}

impl Event for RoomJoin {
    const NAME: &'static str = "edd:room:join";
}

/// A member left a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomLeft {
    /// Member identity.
    pub id: String,
    /// Room id.
    pub room: String,
}

impl Event for RoomLeft {
    const NAME: &'static str = "edd:room:left";
}

/// The room requests a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    /// Create a room and join it.
    Create(RoomCreateRequest),
    /// Join an existing room.
    Join(RoomJoinRequest),
    /// Leave a room.
    Left(RoomLeftRequest),
}

impl RoomRequest {
    /// Whether an event name belongs to the room protocol.
    pub fn is_room_event(name: &str) -> bool {
        name.starts_with(ROOM_EVENT_PREFIX)
    }

    /// Decode a room request from an envelope.
    pub fn decode(envelope: Envelope) -> CoreResult<Self> {
        match envelope.name.as_str() {
            name if name == RoomCreateRequest::ALIAS => envelope.into_event().map(Self::Create),
            name if name == RoomJoinRequest::ALIAS => envelope.into_event().map(Self::Join),
            name if name == RoomLeftRequest::ALIAS => envelope.into_event().map(Self::Left),
            _ => Err(CoreError::UnknownRoomEvent(envelope.name)),
        }
    }

    /// The room the request targets.
    pub fn room(&self) -> &str {
        match self {
            Self::Create(req) => &req.room,
            Self::Join(req) => &req.room,
            Self::Left(req) => &req.room,
        }
    }
}
