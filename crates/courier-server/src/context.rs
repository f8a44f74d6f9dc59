//! Per-event handler context.

use std::sync::Arc;

use crate::server::Server;
use crate::session::{Session, SessionId};

/// What a handler gets alongside the decoded event: the server and the
/// session the event arrived on.
#[derive(Clone, Debug)]
pub struct Context {
    server: Server,
    session: Arc<Session>,
}

impl Context {
    /// Creates a context for `session`.
    pub fn new(server: Server, session: Arc<Session>) -> Self {
        Self { server, session }
    }

    /// The server.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// The originating session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Shorthand for `self.session().id()`.
    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }
}
