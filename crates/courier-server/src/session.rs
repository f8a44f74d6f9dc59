//! Client sessions.
//!
//! A [`Session`] is the server side of one connection: its id, the shared
//! writer, the authentication record, a key/value context store, one typed
//! application state slot and the rooms it belongs to.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use courier_core::{Authentication, Codec, Envelope, Event};
use courier_ws::{ConnectionWriter, Message};
use parking_lot::{Mutex, RwLock};

use crate::error::{AuthError, CourierError, Result};
use crate::room::Room;

type AnyValue = Arc<dyn Any + Send + Sync>;

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One connected client.
pub struct Session {
    id: SessionId,
    writer: Arc<dyn ConnectionWriter>,
    codec: Arc<dyn Codec>,
    write_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    values: RwLock<HashMap<String, AnyValue>>,
    auth: RwLock<Option<Authentication>>,
    state: RwLock<Option<AnyValue>>,
    rooms: Mutex<Vec<Arc<Room>>>,
    connected_at: Instant,
}

impl Session {
    /// Creates a session around an accepted connection's writer.
    ///
    /// The server allocates ids through its registry; see
    /// [`Server::new_session`](crate::Server::new_session).
    pub fn new(id: SessionId, writer: Arc<dyn ConnectionWriter>, codec: Arc<dyn Codec>) -> Self {
        Self {
            id,
            writer,
            codec,
            write_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            values: RwLock::new(HashMap::new()),
            auth: RwLock::new(None),
            state: RwLock::new(None),
            rooms: Mutex::new(Vec::new()),
            connected_at: Instant::now(),
        }
    }

    /// The session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the connection was accepted.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Whether the session stopped accepting writes.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Stops accepting writes and closes the connection.
    pub async fn close(&self) -> Result<()> {
        self.mark_closed();
        let _guard = self.write_lock.lock().await;
        self.writer.close().await?;
        Ok(())
    }

    /// Sends `event` on `channel`.
    pub async fn send<T: Event>(&self, channel: &str, event: &T) -> Result<()> {
        let envelope = Envelope::from_event(channel, event)?;
        self.send_envelope(&envelope).await
    }

    /// Encodes and writes a prepared envelope.
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(CourierError::ClientClosed(self.id));
        }
        let bytes = envelope.encode(self.codec.as_ref())?;
        let message = Message::data(bytes, self.codec.is_binary())?;

        let _guard = self.write_lock.lock().await;
        self.writer.write_message(message).await?;
        Ok(())
    }

    /// Reports a recoverable failure on the `errors` channel.
    pub async fn send_error(&self, message: impl Into<String>) -> Result<()> {
        self.send_envelope(&Envelope::error(message)).await
    }

    /// The authentication record, once a challenge has been passed.
    pub fn auth(&self) -> Option<Authentication> {
        self.auth.read().clone()
    }

    /// The authenticated user id, if any.
    pub fn user_id(&self) -> Option<String> {
        self.auth.read().as_ref().map(|auth| auth.id.clone())
    }

    /// Whether a challenge has been passed.
    pub fn is_authenticated(&self) -> bool {
        self.auth.read().is_some()
    }

    /// Records the authentication.
    ///
    /// The record is set once. Passing another challenge for the same user
    /// keeps the first record; a different user id is refused.
    pub fn set_auth(&self, auth: Authentication) -> Result<(), AuthError> {
        let mut current = self.auth.write();
        match current.as_ref() {
            None => {
                *current = Some(auth);
                Ok(())
            }
            Some(existing) if existing.id == auth.id => Ok(()),
            Some(existing) => Err(AuthError::IdentityConflict {
                session: self.id,
                current: existing.id.clone(),
            }),
        }
    }

    /// The identity announced to other clients: the user id when
    /// authenticated, otherwise the session id.
    pub fn identity(&self) -> String {
        self.user_id().unwrap_or_else(|| self.id.to_string())
    }

    /// Stores a context value under `key`, replacing any previous one.
    pub fn insert_value<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    pub fn value<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.values.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Removes the value under `key`. Returns whether one was present.
    pub fn remove_value(&self, key: &str) -> bool {
        self.values.write().remove(key).is_some()
    }

    /// Installs the application state, replacing any previous state.
    pub fn set_state<T: Send + Sync + 'static>(&self, state: T) {
        let slot: AnyValue = Arc::new(RwLock::new(state));
        *self.state.write() = Some(slot);
    }

    /// Returns the application state if it was installed with type `T`.
    ///
    /// Do not hold the returned lock across an `.await`.
    pub fn state<T: Send + Sync + 'static>(&self) -> Option<Arc<RwLock<T>>> {
        let slot = self.state.read().clone()?;
        slot.downcast::<RwLock<T>>().ok()
    }

    /// Every room the session is in, across channels.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.lock().clone()
    }

    /// The rooms the session is in on one channel.
    pub fn rooms_in(&self, channel: &str) -> Vec<Arc<Room>> {
        self.rooms
            .lock()
            .iter()
            .filter(|room| room.channel() == channel)
            .cloned()
            .collect()
    }

    /// Whether the session lists `room` among its memberships.
    pub fn in_room(&self, room: &Room) -> bool {
        self.rooms
            .lock()
            .iter()
            .any(|r| std::ptr::eq(Arc::as_ptr(r), room))
    }

    // Called by `Room` while it holds its member lock.
    pub(crate) fn add_room(&self, room: Arc<Room>) {
        self.rooms.lock().push(room);
    }

    pub(crate) fn remove_room(&self, room: &Room) {
        self.rooms
            .lock()
            .retain(|r| !std::ptr::eq(Arc::as_ptr(r), room));
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}
