//! Whole connection lifecycles over in-memory connections.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::protocol::{
    AuthChallenge, AuthPass, BasicAuth, RoomCreate, RoomCreateRequest, RoomJoin, RoomJoinRequest,
    RoomLeft, UserJoin, UserLeft,
};
use courier_core::{inbound_events, Authentication, Envelope, Event, NoEvents};
use courier_server::{
    BasicAuthenticator, Channel, ChannelBase, ConnectionManager, Context, CourierError, Receiver,
    Result, RoomManager, Server, ServerConfig, Session, UserPresence,
};
use courier_test::{memory_pair, TestClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Say {
    text: String,
}

impl Event for Say {
    const NAME: &'static str = "Say";
    const ALIAS: &'static str = "say";
}

inbound_events! {
    #[derive(Debug)]
    enum LobbyEvents {
        Say(Say),
    }
}

/// Echoes `say` back to the sender.
struct Lobby {
    base: ChannelBase<LobbyEvents>,
    presence: Option<UserPresence>,
    rooms: RoomManager,
    refuse: bool,
}

impl Lobby {
    fn new() -> Self {
        Self {
            base: ChannelBase::new("lobby"),
            presence: None,
            rooms: RoomManager::new(),
            refuse: false,
        }
    }

    fn with_presence(mut self) -> Self {
        self.presence = Some(UserPresence::new());
        self
    }

    fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }
}

#[async_trait]
impl Channel for Lobby {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn bind(&self, server: &Server) -> Result<()> {
        self.base.bind(server)
    }

    fn set_receiver(self: Arc<Self>) {
        let weak = Arc::downgrade(&self);
        let receiver: Weak<dyn Receiver<LobbyEvents>> = weak;
        self.base.set_receiver(receiver);
    }

    async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
        self.base.route(ctx, envelope).await
    }

    async fn connected(&self, _session: &Arc<Session>) -> Result<()> {
        if self.refuse {
            return Err(CourierError::handler("lobby is closed"));
        }
        Ok(())
    }

    fn room_manager(&self) -> Option<&RoomManager> {
        Some(&self.rooms)
    }

    fn presence(&self) -> Option<&UserPresence> {
        self.presence.as_ref()
    }
}

#[async_trait]
impl Receiver<LobbyEvents> for Lobby {
    async fn receive(&self, ctx: &Context, event: LobbyEvents) -> Result<()> {
        let LobbyEvents::Say(say) = event;
        self.base.send(ctx.session(), &say).await
    }
}

/// Auth-gated channel that accepts the password `secret`.
struct Vault {
    base: ChannelBase<NoEvents>,
    users: ConnectionManager,
    presence: UserPresence,
}

impl Vault {
    fn new() -> Self {
        Self {
            base: ChannelBase::new("vault"),
            users: ConnectionManager::new(),
            presence: UserPresence::new(),
        }
    }
}

#[async_trait]
impl Channel for Vault {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn bind(&self, server: &Server) -> Result<()> {
        self.base.bind(server)
    }

    async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
        self.base.route(ctx, envelope).await
    }

    fn basic_auth(&self) -> Option<&dyn BasicAuthenticator> {
        Some(self)
    }

    fn connection_manager(&self) -> Option<&ConnectionManager> {
        Some(&self.users)
    }

    fn presence(&self) -> Option<&UserPresence> {
        Some(&self.presence)
    }
}

#[async_trait]
impl BasicAuthenticator for Vault {
    async fn on_basic_auth(&self, _ctx: &Context, credentials: BasicAuth) -> Result<Authentication> {
        if credentials.password == "secret" {
            Ok(Authentication::new(credentials.username))
        } else {
            Err(CourierError::handler("bad credentials"))
        }
    }
}

fn server_with(channel: impl Channel) -> Server {
    let server = Server::new(ServerConfig::default());
    server.register(Arc::new(channel)).unwrap();
    server
}

fn connect(server: &Server) -> TestClient {
    let (connection, client) = memory_pair();
    let server = server.clone();
    tokio::spawn(async move { server.handle_connection(connection).await });
    client
}

async fn say(client: &TestClient, text: &str) {
    client.send("lobby", &Say { text: text.into() }).unwrap();
    let echo: Say = client.expect_event("lobby").await.unwrap();
    assert_eq!(echo.text, text);
}

async fn login(server: &Server, username: &str) -> TestClient {
    let client = connect(server);
    let challenge: AuthChallenge = client.expect_event("vault").await.unwrap();
    assert_eq!(challenge.methods, vec!["edd:auth:basic".to_string()]);

    let credentials = BasicAuth {
        username: username.into(),
        password: "secret".into(),
    };
    client.send("vault", &credentials).unwrap();
    let pass: AuthPass = client.expect_event("vault").await.unwrap();
    assert_eq!(pass.id, username);
    client
}

#[tokio::test]
async fn test_routes_events_to_channel() {
    let server = server_with(Lobby::new());
    let client = connect(&server);

    say(&client, "hello").await;
    say(&client, "again").await;
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test]
async fn test_unknown_event_keeps_connection_open() {
    let server = server_with(Lobby::new());
    let client = connect(&server);

    client
        .send_envelope(&Envelope::new("lobby", "dance", serde_json::json!({})))
        .unwrap();
    let error = client.expect_error().await.unwrap();
    assert_eq!(
        error,
        "error while processing event: handler for event 'dance' on channel 'lobby' was not expected"
    );

    client
        .send_envelope(&Envelope::new("nowhere", "say", serde_json::json!({})))
        .unwrap();
    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "error while processing event: unknown channel nowhere");

    say(&client, "still here").await;
}

#[tokio::test]
async fn test_refused_connection_is_closed() {
    let server = server_with(Lobby::new().refusing());
    let client = connect(&server);

    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "error while connecting on lobby: lobby is closed");
    client.expect_closed().await.unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_presence_without_authentication() {
    let server = server_with(Lobby::new().with_presence());

    let ann = connect(&server);
    say(&ann, "ready").await;

    let bob = connect(&server);
    let catch_up: UserJoin = bob.expect_event("lobby").await.unwrap();
    assert_eq!(catch_up.id, "1");
    let joined: UserJoin = ann.expect_event("lobby").await.unwrap();
    assert_eq!(joined.id, "2");

    ann.close();
    let left: UserLeft = bob.expect_event("lobby").await.unwrap();
    assert_eq!(left.id, "1");
}

#[tokio::test]
async fn test_auth_rejection_closes_connection() {
    let server = server_with(Vault::new());
    let client = connect(&server);
    let _: AuthChallenge = client.expect_event("vault").await.unwrap();

    let credentials = BasicAuth {
        username: "ann".into(),
        password: "guess".into(),
    };
    client.send("vault", &credentials).unwrap();

    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "authentication rejected on vault: bad credentials");
    client.expect_closed().await.unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_auth_answer_on_wrong_event() {
    let server = server_with(Vault::new());
    let client = connect(&server);
    let _: AuthChallenge = client.expect_event("vault").await.unwrap();

    client
        .send_envelope(&Envelope::new("vault", "edd:auth:token", serde_json::json!({})))
        .unwrap();
    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "unsupported auth method edd:auth:token");
    client.expect_closed().await.unwrap();
}

#[tokio::test]
async fn test_auth_answer_on_other_channel_rejects() {
    let server = server_with(Vault::new());
    server.register(Arc::new(Lobby::new())).unwrap();
    let client = connect(&server);
    let _: AuthChallenge = client.expect_event("vault").await.unwrap();

    let credentials = BasicAuth {
        username: "ann".into(),
        password: "secret".into(),
    };
    client.send("lobby", &credentials).unwrap();

    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "auth answer on channel lobby, expected vault");
    client.expect_closed().await.unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_undecodable_auth_answer_rejects() {
    let server = server_with(Vault::new());
    let client = connect(&server);
    let _: AuthChallenge = client.expect_event("vault").await.unwrap();

    client.send_raw(b"{not json".to_vec()).unwrap();

    let error = client.expect_error().await.unwrap();
    assert!(error.starts_with("failed to decode json value"), "{error}");
    client.expect_closed().await.unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_shutdown_ends_pending_challenge() {
    let server = server_with(Vault::new());
    let client = connect(&server);
    let _: AuthChallenge = client.expect_event("vault").await.unwrap();

    server.shutdown();

    let error = client.expect_error().await.unwrap();
    assert_eq!(error, "server is shutting down");
    client.expect_closed().await.unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_presence_follows_users_not_sessions() {
    let server = server_with(Vault::new());

    let ann = login(&server, "ann").await;
    let bob = login(&server, "bob").await;
    let catch_up: UserJoin = bob.expect_event("vault").await.unwrap();
    assert_eq!(catch_up.id, "ann");
    let joined: UserJoin = ann.expect_event("vault").await.unwrap();
    assert_eq!(joined.id, "bob");

    // A second session of a known user is caught up but not announced.
    let ann_again = login(&server, "ann").await;
    let catch_up: UserJoin = ann_again.expect_event("vault").await.unwrap();
    assert_eq!(catch_up.id, "bob");
    assert!(bob.is_silent_for(Duration::from_millis(100)).await);

    ann.close();
    assert!(bob.is_silent_for(Duration::from_millis(100)).await);

    ann_again.close();
    let left: UserLeft = bob.expect_event("vault").await.unwrap();
    assert_eq!(left.id, "ann");
}

#[tokio::test]
async fn test_rooms_over_the_wire() {
    let server = server_with(Lobby::new());

    let ann = connect(&server);
    ann.send(
        "lobby",
        &RoomCreateRequest {
            room: "den".into(),
            public: true,
        },
    )
    .unwrap();
    let created: RoomCreate = ann.expect_event("lobby").await.unwrap();
    assert_eq!(created.room, "den");
    let joined: RoomJoin = ann.expect_event("lobby").await.unwrap();
    assert_eq!(joined.id, "1");

    let bob = connect(&server);
    bob.send("lobby", &RoomJoinRequest { room: "den".into() }).unwrap();
    let own: RoomJoin = bob.expect_event("lobby").await.unwrap();
    assert_eq!(own.id, "2");
    let catch_up: RoomJoin = bob.expect_event("lobby").await.unwrap();
    assert_eq!(catch_up.id, "1");
    let announced: RoomJoin = ann.expect_event("lobby").await.unwrap();
    assert_eq!(announced.id, "2");

    bob.send("lobby", &RoomJoinRequest { room: "attic".into() }).unwrap();
    let error = bob.expect_error().await.unwrap();
    assert_eq!(error, "error while processing event: unknown room attic");

    bob.close();
    let left: RoomLeft = ann.expect_event("lobby").await.unwrap();
    assert_eq!(left.id, "2");
    assert_eq!(left.room, "den");
}
