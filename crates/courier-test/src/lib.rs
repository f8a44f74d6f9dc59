//! # Courier Test
//!
//! Test utilities for Courier channels and servers, without sockets.
//!
//! - [`memory_pair`] gives a [`MemoryConnection`] for
//!   [`Server::handle_connection`](courier_server::Server::handle_connection)
//!   and the [`TestClient`] on the other end, so whole connection
//!   lifecycles (auth, admission, routing, teardown) run in-process.
//! - [`RecordingWriter`] stands in for a connection writer and keeps
//!   every envelope the server sends.
//! - [`ChannelBehave`] drives one channel through its hooks and routing
//!   with recorded clients.
//!
//! ## Example
//!
//! ```ignore
//! use courier_test::memory_pair;
//!
//! #[tokio::test]
//! async fn test_ping() {
//!     let server = Server::new(ServerConfig::default());
//!     server.register(Arc::new(PingPong::new()))?;
//!
//!     let (connection, client) = memory_pair();
//!     tokio::spawn({
//!         let server = server.clone();
//!         async move { server.handle_connection(connection).await }
//!     });
//!
//!     let ping: Ping = client.expect_event("pingpong").await?;
//!     assert_eq!(ping.id, 1);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/courier-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod behave;
mod client;
mod error;
mod memory;
mod recording;

pub use behave::ChannelBehave;
pub use client::{TestClient, DEFAULT_TIMEOUT};
pub use error::{TestError, TestResult};
pub use memory::{memory_pair, MemoryConnection};
pub use recording::{RecordedEvent, RecordingWriter};
