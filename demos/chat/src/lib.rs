//! The chat channel.
//!
//! Every client gets a random name on connect. Others are told it entered;
//! the newcomer is told its own name and the current user list. Messages
//! and renames are relayed to everyone else, stamped with the sender's id.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use courier::core::direction;
use courier::core::CoreResult;
use courier::prelude::*;
use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Asks for (from a client) or announces (from the server) a new name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeName {
    /// Set by the server only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// The new name.
    pub name: String,
}

impl Event for ChangeName {
    const NAME: &'static str = "ChangeName";

    fn check_received_fields(&self) -> CoreResult<()> {
        direction::server_only(Self::NAME, "userId", &self.user_id)
    }
}

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Set by the server only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// The text.
    pub text: String,
}

impl Event for Message {
    const NAME: &'static str = "Message";

    fn check_received_fields(&self) -> CoreResult<()> {
        direction::server_only(Self::NAME, "userId", &self.user_id)
    }
}

/// A user connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEnter {
    /// Session id of the user.
    pub user_id: u64,
    /// Name it was given.
    pub name: String,
}

impl Event for UserEnter {
    const NAME: &'static str = "UserEnter";
}

/// A user disconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    /// Session id of the user.
    pub user_id: u64,
}

impl Event for UserLeft {
    const NAME: &'static str = "UserLeft";
}

/// Everyone connected, by session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListUpdate {
    /// Session id to name.
    pub list: BTreeMap<u64, String>,
}

impl Event for UserListUpdate {
    const NAME: &'static str = "UserListUpdate";
}

inbound_events! {
    /// What clients may send on `chat`. The user events are server to
    /// client only.
    #[derive(Debug)]
    pub enum ChatEvents {
        /// Rename request.
        ChangeName(ChangeName),
        /// Chat line.
        Message(Message),
    }
}

const ADJECTIVES: &[&str] = &[
    "Brave", "Clumsy", "Dizzy", "Fluffy", "Grumpy", "Jolly", "Lazy", "Mighty", "Nimble", "Quirky",
    "Sleepy", "Sneaky", "Wobbly", "Zesty",
];

const ANIMALS: &[&str] = &[
    "Badger", "Beaver", "Dodo", "Ferret", "Gecko", "Llama", "Marmot", "Narwhal", "Otter",
    "Penguin", "Platypus", "Quokka", "Walrus", "Yak",
];

/// A random two-word name such as `WobblyNarwhal`.
pub fn silly_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Quiet");
    let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("Mouse");
    format!("{adjective}{animal}")
}

/// The `chat` channel.
#[derive(Debug)]
pub struct ChatChannel {
    base: ChannelBase<ChatEvents>,
    users: RwLock<BTreeMap<u64, String>>,
}

impl ChatChannel {
    /// Creates the channel with no users.
    pub fn new() -> Self {
        Self {
            base: ChannelBase::new("chat"),
            users: RwLock::new(BTreeMap::new()),
        }
    }

    /// Current name of a user.
    pub fn name_of(&self, user_id: u64) -> Option<String> {
        self.users.read().get(&user_id).cloned()
    }

    /// Snapshot of every connected user.
    pub fn users(&self) -> BTreeMap<u64, String> {
        self.users.read().clone()
    }

    async fn on_change_name(&self, ctx: &Context, change: ChangeName) -> Result<()> {
        let id = ctx.session_id().get();
        info!(user_id = id, name = %change.name, "Name changed");
        self.users.write().insert(id, change.name.clone());

        let targets = ctx.server().clients(&[ctx.session_id()]);
        let event = ChangeName {
            user_id: Some(id),
            name: change.name,
        };
        self.base.broadcast(&targets, &event).await
    }

    async fn on_message(&self, ctx: &Context, message: Message) -> Result<()> {
        let id = ctx.session_id().get();
        debug!(user_id = id, "Relaying message");

        let targets = ctx.server().clients(&[ctx.session_id()]);
        let event = Message {
            user_id: Some(id),
            text: message.text,
        };
        self.base.broadcast(&targets, &event).await
    }
}

impl Default for ChatChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for ChatChannel {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn bind(&self, server: &Server) -> Result<()> {
        self.base.bind(server)
    }

    fn set_receiver(self: Arc<Self>) {
        let weak = Arc::downgrade(&self);
        let receiver: Weak<dyn Receiver<ChatEvents>> = weak;
        self.base.set_receiver(receiver);
    }

    async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
        self.base.route(ctx, envelope).await
    }

    async fn connected(&self, session: &Arc<Session>) -> Result<()> {
        let id = session.id().get();
        let name = silly_name();
        info!(user_id = id, name = %name, "User connected");
        let list = {
            let mut users = self.users.write();
            users.insert(id, name.clone());
            users.clone()
        };

        let others = self.base.server()?.clients(&[session.id()]);
        let enter = UserEnter {
            user_id: id,
            name: name.clone(),
        };
        if let Err(e) = self.base.broadcast(&others, &enter).await {
            debug!(error = %e, "User enter announcement incomplete");
        }

        self.base.send(session, &ChangeName { user_id: None, name }).await?;
        self.base.send(session, &UserListUpdate { list }).await
    }

    async fn disconnected(&self, session: &Arc<Session>) -> Result<()> {
        let id = session.id().get();
        let name = self.users.write().remove(&id);
        info!(user_id = id, name = ?name, "User disconnected");

        let others = self.base.server()?.clients(&[session.id()]);
        self.base.broadcast(&others, &UserLeft { user_id: id }).await
    }
}

#[async_trait]
impl Receiver<ChatEvents> for ChatChannel {
    async fn receive(&self, ctx: &Context, event: ChatEvents) -> Result<()> {
        match event {
            ChatEvents::ChangeName(change) => self.on_change_name(ctx, change).await,
            ChatEvents::Message(message) => self.on_message(ctx, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier::core::CoreError;
    use courier_test::{memory_pair, ChannelBehave};

    #[tokio::test]
    async fn test_basic_scenario() {
        let behave = ChannelBehave::given(Arc::new(ChatChannel::new())).unwrap();
        let ch = Arc::clone(behave.channel());

        behave.add_client(1).await.unwrap();
        assert_eq!(ch.users().len(), 1);
        assert!(behave.has_event(1, &UserListUpdate { list: ch.users() }));

        behave.add_client(2).await.unwrap();
        assert_eq!(ch.users().len(), 2);
        assert!(behave.has_event(2, &UserListUpdate { list: ch.users() }));
        let enter = UserEnter {
            user_id: 2,
            name: ch.name_of(2).unwrap(),
        };
        assert!(behave.has_event(1, &enter));

        behave
            .dispatch(1, &ChangeName { user_id: None, name: "test".into() })
            .await
            .unwrap();
        assert!(behave.has_event(2, &ChangeName { user_id: Some(1), name: "test".into() }));
        assert_eq!(ch.name_of(1).as_deref(), Some("test"));

        behave
            .dispatch(1, &Message { user_id: None, text: "test message".into() })
            .await
            .unwrap();
        assert!(behave.has_event(2, &Message { user_id: Some(1), text: "test message".into() }));
        assert!(!behave.has_event(1, &Message { user_id: Some(1), text: "test message".into() }));

        behave.remove_client(1).await.unwrap();
        assert_eq!(ch.users().len(), 1);
        assert!(behave.has_event(2, &UserLeft { user_id: 1 }));
    }

    #[tokio::test]
    async fn test_newcomer_learns_its_name() {
        let behave = ChannelBehave::given(Arc::new(ChatChannel::new())).unwrap();
        behave.add_client(4).await.unwrap();

        let name = behave.channel().name_of(4).unwrap();
        assert!(behave.has_event(4, &ChangeName { user_id: None, name }));
        assert_eq!(behave.client(4).unwrap().count::<UserEnter>(), 0);
    }

    #[tokio::test]
    async fn test_client_cannot_stamp_user_id() {
        let behave = ChannelBehave::given(Arc::new(ChatChannel::new())).unwrap();
        behave.add_client(1).await.unwrap();
        behave.add_client(2).await.unwrap();
        behave.clear_recorded();

        let err = behave
            .dispatch(1, &Message { user_id: Some(2), text: "spoof".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("userId"));
        assert_eq!(behave.client(2).unwrap().count::<Message>(), 0);
    }

    #[tokio::test]
    async fn test_user_events_are_server_to_client() {
        let server = Server::new(ServerConfig::default());
        server.register(Arc::new(ChatChannel::new())).unwrap();

        let (connection, client) = memory_pair();
        tokio::spawn({
            let server = server.clone();
            async move { server.handle_connection(connection).await }
        });
        let _: ChangeName = client.expect_event("chat").await.unwrap();
        let _: UserListUpdate = client.expect_event("chat").await.unwrap();

        client.send("chat", &UserLeft { user_id: 1 }).unwrap();
        let error = client.expect_error().await.unwrap();
        assert!(error.contains("handler for event 'UserLeft'"));
    }

    #[test]
    fn test_silly_names() {
        let name = silly_name();
        assert!(ADJECTIVES.iter().any(|a| name.starts_with(a)));
        assert!(ANIMALS.iter().any(|a| name.ends_with(a)));
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(UserEnter { user_id: 3, name: "Yak".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"userId": 3, "name": "Yak"}));

        let err = ChangeName { user_id: Some(1), name: "x".into() }
            .check_received_fields()
            .unwrap_err();
        assert!(matches!(err, CoreError::ReceivedFields { .. }));
    }
}
