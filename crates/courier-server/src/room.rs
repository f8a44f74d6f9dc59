//! Rooms: named subgroups of a channel's sessions.
//!
//! Membership is kept on both sides. A [`Room`] lists its member sessions
//! and every member [`Session`] lists its rooms; both sides change under the
//! room's member lock, so the two views always agree.
//!
//! Joining broadcasts `edd:room:join` to every member, the joiner included,
//! and then sends the joiner one `edd:room:join` per member that was already
//! there. Leaving broadcasts `edd:room:left` to the members as they were
//! before the leaver was removed, so an explicit leave is confirmed to the
//! leaver too. Announcements are sent after the locks are released, to a
//! snapshot taken under them.
//!
//! A [`RoomManager`] owns a channel's rooms and implements the client room
//! protocol (`edd:room:create_request`, `join_request`, `left_request`).
//! In the default single-room mode joining a room first leaves the current
//! one; in multi-room mode a per-user limit applies (0 means unlimited).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use courier_core::protocol::{RoomCreate, RoomJoin, RoomLeft, RoomRequest};
use courier_core::Event;
use courier_telemetry::metrics::{record_room_change, RoomChange};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::error::{CourierError, Result, RoomError};
use crate::server::{Server, WeakServer};
use crate::session::{Session, SessionId};

/// A named group of sessions on one channel.
pub struct Room {
    id: String,
    public: bool,
    channel: String,
    members: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl Room {
    pub(crate) fn new(id: impl Into<String>, public: bool, channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public,
            channel: channel.into(),
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Room id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the room is announced to every client.
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Alias of the channel the room belongs to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current members.
    pub fn members(&self) -> Vec<Arc<Session>> {
        self.members.read().values().cloned().collect()
    }

    /// Whether `session` is a member.
    pub fn has(&self, session: &Session) -> bool {
        self.members.read().contains_key(&session.id())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    /// Whether the room has no members.
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Adds `session` and announces it.
    pub async fn join(self: &Arc<Self>, session: &Arc<Session>) -> Result<(), RoomError> {
        let members = self.insert(session)?;
        self.announce_join(session, &members).await;
        Ok(())
    }

    /// Removes `session` and announces it.
    pub async fn left(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let members = self.remove(session)?;
        self.announce_left(session, &members).await;
        Ok(())
    }

    /// Adds the member on both sides. Returns the members after the join.
    pub(crate) fn insert(self: &Arc<Self>, session: &Arc<Session>) -> Result<Vec<Arc<Session>>, RoomError> {
        let mut members = self.members.write();
        if members.contains_key(&session.id()) {
            return Err(RoomError::AlreadyMember {
                room: self.id.clone(),
            });
        }
        members.insert(session.id(), Arc::clone(session));
        session.add_room(Arc::clone(self));
        Ok(members.values().cloned().collect())
    }

    /// Removes the member on both sides. Returns the members before the
    /// removal.
    pub(crate) fn remove(&self, session: &Session) -> Result<Vec<Arc<Session>>, RoomError> {
        let mut members = self.members.write();
        if !members.contains_key(&session.id()) {
            return Err(RoomError::NotMember {
                room: self.id.clone(),
            });
        }
        let snapshot = members.values().cloned().collect();
        members.remove(&session.id());
        session.remove_room(self);
        Ok(snapshot)
    }

    async fn announce_join(&self, session: &Arc<Session>, members: &[Arc<Session>]) {
        record_room_change(&self.channel, RoomChange::Join);
        let event = RoomJoin {
            id: session.identity(),
            room: self.id.clone(),
        };
        self.announce(&event, members).await;

        for member in members.iter().filter(|m| m.id() != session.id()) {
            let catch_up = RoomJoin {
                id: member.identity(),
                room: self.id.clone(),
            };
            if let Err(e) = session.send(&self.channel, &catch_up).await {
                debug!(room = %self.id, error = %e, "Failed to send room catch-up");
                break;
            }
        }
    }

    async fn announce_left(&self, session: &Arc<Session>, members: &[Arc<Session>]) {
        record_room_change(&self.channel, RoomChange::Left);
        let event = RoomLeft {
            id: session.identity(),
            room: self.id.clone(),
        };
        self.announce(&event, members).await;
    }

    async fn announce<T: Event>(&self, event: &T, members: &[Arc<Session>]) {
        let targets: Vec<_> = members.iter().filter(|m| !m.is_closed()).cloned().collect();
        if let Err(e) = broadcast(&self.channel, event, &targets).await {
            warn!(room = %self.id, error = %e, "Room announcement failed");
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("public", &self.public)
            .field("channel", &self.channel)
            .field("members", &self.len())
            .finish()
    }
}

struct Binding {
    channel: String,
    server: WeakServer,
}

/// Room capability a channel embeds and returns from
/// [`Channel::room_manager`](crate::Channel::room_manager).
///
/// Rooms can only be created once the channel is registered, since they
/// belong to its alias.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    multi_room: AtomicBool,
    limit: AtomicUsize,
    // Serializes membership decisions so checks and changes stay atomic.
    membership: Mutex<()>,
    binding: OnceLock<Binding>,
}

impl RoomManager {
    /// Creates a manager in single-room mode.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            multi_room: AtomicBool::new(false),
            limit: AtomicUsize::new(0),
            membership: Mutex::new(()),
            binding: OnceLock::new(),
        }
    }

    /// Whether sessions may be in several rooms at once.
    pub fn multi_room(&self) -> bool {
        self.multi_room.load(Ordering::Acquire)
    }

    /// Enables or disables multi-room mode.
    pub fn set_multi_room_mode(&self, enabled: bool) {
        self.multi_room.store(enabled, Ordering::Release);
    }

    /// Rooms per session in multi-room mode. 0 means unlimited.
    pub fn rooms_per_user_limit(&self) -> usize {
        self.limit.load(Ordering::Acquire)
    }

    /// Sets the multi-room limit. 0 means unlimited.
    pub fn set_rooms_per_user_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Release);
    }

    pub(crate) fn bind(&self, channel: &str, server: &Server) -> Result<()> {
        self.binding
            .set(Binding {
                channel: channel.to_string(),
                server: server.downgrade(),
            })
            .map_err(|_| CourierError::AlreadyBound(channel.to_string()))
    }

    fn binding(&self) -> Result<&Binding, RoomError> {
        self.binding.get().ok_or(RoomError::NotBound)
    }

    /// Alias of the owning channel, once registered.
    pub fn channel(&self) -> Option<&str> {
        self.binding.get().map(|b| b.channel.as_str())
    }

    /// Creates a room.
    pub fn create(&self, id: impl Into<String>, public: bool) -> Result<Arc<Room>, RoomError> {
        let id = id.into();
        let channel = &self.binding()?.channel;
        let mut rooms = self.rooms.write();
        if rooms.contains_key(&id) {
            return Err(RoomError::DuplicateRoom(id));
        }
        let room = Arc::new(Room::new(id.clone(), public, channel.clone()));
        rooms.insert(id, Arc::clone(&room));
        info!(channel = %channel, room = %room.id(), public, "Room created");
        Ok(room)
    }

    /// Looks up a room.
    pub fn room(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.read().get(id).cloned()
    }

    /// Every room.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.read().values().cloned().collect()
    }

    /// Every public room.
    pub fn public_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms
            .read()
            .values()
            .filter(|room| room.is_public())
            .cloned()
            .collect()
    }

    /// Handles one client room request.
    pub async fn on_room_event(&self, session: &Arc<Session>, request: RoomRequest) -> Result<()> {
        match request {
            RoomRequest::Create(req) => self.create_for(session, req.room, req.public).await,
            RoomRequest::Join(req) => self.join(session, &req.room).await,
            RoomRequest::Left(req) => self.leave(session, &req.room).await,
        }
    }

    /// Joins `session` to a room, leaving its current room first in
    /// single-room mode.
    pub async fn join(&self, session: &Arc<Session>, room_id: &str) -> Result<()> {
        let channel = &self.binding()?.channel;
        let room = self
            .room(room_id)
            .ok_or_else(|| RoomError::UnknownRoom(room_id.to_string()))?;

        let (departures, members) = {
            let _membership = self.membership.lock();
            if room.has(session) {
                return Err(RoomError::AlreadyMember {
                    room: room_id.to_string(),
                }
                .into());
            }

            self.check_capacity(session, channel)?;
            let mut departures = Vec::new();
            if !self.multi_room() {
                for previous in session.rooms_in(channel) {
                    let snapshot = previous.remove(session)?;
                    departures.push((previous, snapshot));
                }
            }
            (departures, room.insert(session)?)
        };

        for (previous, snapshot) in departures {
            previous.announce_left(session, &snapshot).await;
        }
        room.announce_join(session, &members).await;
        debug!(room = %room_id, session_id = %session.id(), "Joined room");
        Ok(())
    }

    /// Removes `session` from a room.
    pub async fn leave(&self, session: &Arc<Session>, room_id: &str) -> Result<()> {
        let room = self
            .room(room_id)
            .ok_or_else(|| RoomError::UnknownRoom(room_id.to_string()))?;
        self.leave_room(&room, session).await?;
        Ok(())
    }

    async fn leave_room(&self, room: &Room, session: &Arc<Session>) -> Result<(), RoomError> {
        let snapshot = {
            let _membership = self.membership.lock();
            room.remove(session)?
        };
        room.announce_left(session, &snapshot).await;
        debug!(room = %room.id(), session_id = %session.id(), "Left room");
        Ok(())
    }

    /// Creates a room on behalf of `session`, announces it and joins the
    /// creator.
    ///
    /// Public rooms are announced to every admitted session, private ones
    /// only to the creator.
    ///
    /// A creator already at its room limit is refused before the room
    /// exists. A room whose creator could not join it is removed again.
    pub async fn create_for(&self, session: &Arc<Session>, room_id: impl Into<String>, public: bool) -> Result<()> {
        {
            let channel = &self.binding()?.channel;
            let _membership = self.membership.lock();
            self.check_capacity(session, channel)?;
        }
        let room = self.create(room_id, public)?;
        let event = RoomCreate {
            room: room.id().to_string(),
        };

        let announced = if public {
            let server = self.server()?;
            self.broadcast_room_event(&server.clients(&[]), &event).await
        } else {
            self.send_room_event(session, &event).await
        };
        if let Err(e) = announced {
            warn!(room = %room.id(), error = %e, "Room creation announcement failed");
        }

        if let Err(e) = self.join(session, room.id()).await {
            if room.is_empty() {
                self.rooms.write().remove(room.id());
            }
            return Err(e);
        }
        Ok(())
    }

    // Multi-room limit. Single-room mode always has room for one more.
    fn check_capacity(&self, session: &Session, channel: &str) -> Result<(), RoomError> {
        if !self.multi_room() {
            return Ok(());
        }
        let limit = self.rooms_per_user_limit();
        if limit > 0 && session.rooms_in(channel).len() >= limit {
            return Err(RoomError::LimitReached { limit });
        }
        Ok(())
    }

    /// Sends an event to one session on the owning channel.
    pub async fn send_room_event<T: Event>(&self, session: &Session, event: &T) -> Result<()> {
        let channel = &self.binding()?.channel;
        session.send(channel, event).await
    }

    /// Sends an event to several sessions on the owning channel.
    pub async fn broadcast_room_event<T: Event>(&self, targets: &[Arc<Session>], event: &T) -> Result<()> {
        let channel = &self.binding()?.channel;
        broadcast(channel, event, targets).await
    }

    /// Sends `session` one `edd:room:create` per public room.
    pub async fn send_public_rooms(&self, session: &Session) -> Result<()> {
        for room in self.public_rooms() {
            let event = RoomCreate {
                room: room.id().to_string(),
            };
            self.send_room_event(session, &event).await?;
        }
        Ok(())
    }

    /// Removes a departing session from every room on this channel.
    /// Failures are logged.
    pub async fn room_client_quit(&self, session: &Arc<Session>) {
        let Some(channel) = self.channel() else {
            return;
        };
        for room in session.rooms_in(channel) {
            if let Err(e) = self.leave_room(&room, session).await {
                debug!(room = %room.id(), error = %e, "Room cleanup skipped");
            }
        }
    }

    fn server(&self) -> Result<Server> {
        self.binding()?
            .server
            .upgrade()
            .ok_or(CourierError::ServerGone)
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RoomManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager")
            .field("channel", &self.channel())
            .field("rooms", &self.rooms.read().len())
            .field("multi_room", &self.multi_room())
            .field("limit", &self.rooms_per_user_limit())
            .finish_non_exhaustive()
    }
}
