//! The ping-pong channel.
//!
//! The server pings every client as it connects. A client ping is answered
//! with a pong carrying the same id; a client pong is answered, after a
//! delay, with a ping carrying the next id.

use std::sync::{Arc, Weak};
use std::time::Duration;

use courier::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delay between a client's pong and the next ping.
pub const DEFAULT_REPING_DELAY: Duration = Duration::from_secs(1);

/// A ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Sequence number.
    pub id: i64,
}

impl Event for Ping {
    const NAME: &'static str = "Ping";
}

/// A pong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    /// Sequence number of the ping being answered.
    pub id: i64,
}

impl Event for Pong {
    const NAME: &'static str = "Pong";
}

inbound_events! {
    /// What clients may send on `pingpong`.
    #[derive(Debug)]
    pub enum PingPongEvents {
        /// A client ping.
        Ping(Ping),
        /// A client pong.
        Pong(Pong),
    }
}

/// The `pingpong` channel.
#[derive(Debug)]
pub struct PingPong {
    base: ChannelBase<PingPongEvents>,
    reping_delay: Duration,
}

impl PingPong {
    /// Creates the channel, re-pinging `reping_delay` after each pong.
    pub fn new(reping_delay: Duration) -> Self {
        Self {
            base: ChannelBase::new("pingpong"),
            reping_delay,
        }
    }
}

impl Default for PingPong {
    fn default() -> Self {
        Self::new(DEFAULT_REPING_DELAY)
    }
}

#[async_trait]
impl Channel for PingPong {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn bind(&self, server: &Server) -> Result<()> {
        self.base.bind(server)
    }

    fn set_receiver(self: Arc<Self>) {
        let weak = Arc::downgrade(&self);
        let receiver: Weak<dyn Receiver<PingPongEvents>> = weak;
        self.base.set_receiver(receiver);
    }

    async fn route(&self, ctx: &Context, envelope: Envelope) -> Result<()> {
        self.base.route(ctx, envelope).await
    }

    async fn connected(&self, session: &Arc<Session>) -> Result<()> {
        self.base.send(session, &Ping { id: 1 }).await
    }
}

#[async_trait]
impl Receiver<PingPongEvents> for PingPong {
    async fn receive(&self, ctx: &Context, event: PingPongEvents) -> Result<()> {
        match event {
            PingPongEvents::Ping(ping) => self.base.send(ctx.session(), &Pong { id: ping.id }).await,
            PingPongEvents::Pong(pong) => {
                let session = Arc::clone(ctx.session());
                let channel = self.base.alias().to_string();
                let delay = self.reping_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let next = Ping { id: pong.id + 1 };
                    if let Err(e) = session.send(&channel, &next).await {
                        debug!(session_id = %session.id(), error = %e, "Re-ping dropped");
                    }
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_test::{memory_pair, ChannelBehave};

    const WAIT: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_basic_scenario() {
        let behave = ChannelBehave::given(Arc::new(PingPong::new(WAIT))).unwrap();

        behave.add_client(1).await.unwrap();
        assert!(behave.has_event(1, &Ping { id: 1 }));

        behave.dispatch(1, &Pong { id: 1 }).await.unwrap();
        assert!(!behave.has_event(1, &Ping { id: 2 }));

        tokio::time::sleep(WAIT + Duration::from_millis(100)).await;
        assert!(behave.has_event(1, &Ping { id: 2 }));
    }

    #[tokio::test]
    async fn test_ping_is_answered() {
        let behave = ChannelBehave::given(Arc::new(PingPong::default())).unwrap();
        behave.add_client(7).await.unwrap();

        behave.dispatch(7, &Ping { id: 41 }).await.unwrap();
        assert!(behave.has_event(7, &Pong { id: 41 }));
        assert_eq!(behave.client(7).unwrap().count::<Ping>(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reping_after_disconnect_is_dropped() {
        let behave = ChannelBehave::given(Arc::new(PingPong::new(WAIT))).unwrap();
        behave.add_client(1).await.unwrap();

        behave.dispatch(1, &Pong { id: 1 }).await.unwrap();
        behave.remove_client(1).await.unwrap();

        tokio::time::sleep(WAIT * 2).await;
        assert!(!behave.has_event(1, &Ping { id: 2 }));
    }

    #[tokio::test]
    async fn test_over_a_connection() {
        let server = Server::new(ServerConfig::default());
        server
            .register(Arc::new(PingPong::new(Duration::from_millis(10))))
            .unwrap();

        let (connection, client) = memory_pair();
        tokio::spawn({
            let server = server.clone();
            async move { server.handle_connection(connection).await }
        });

        let ping: Ping = client.expect_event("pingpong").await.unwrap();
        assert_eq!(ping.id, 1);

        client.send("pingpong", &Pong { id: 1 }).unwrap();
        let ping: Ping = client.expect_event("pingpong").await.unwrap();
        assert_eq!(ping.id, 2);

        client.send("pingpong", &Ping { id: 9 }).unwrap();
        let pong: Pong = client.expect_event("pingpong").await.unwrap();
        assert_eq!(pong.id, 9);
    }
}
