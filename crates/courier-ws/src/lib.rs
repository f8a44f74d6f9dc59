//! WebSocket transport for Courier.
//!
//! This crate accepts WebSocket upgrades with `tokio-tungstenite` and
//! exposes each connection through the [`ConnectionReader`] /
//! [`ConnectionWriter`] pair the server runs sessions on.
//!
//! # Features
//!
//! - **Path-scoped handshake**: upgrades on other paths get `404`
//! - **Data frames only**: pings are answered, pongs dropped, close frames
//!   surface as [`WsError::ConnectionClosed`]
//! - **Inbound size limit** enforced per message
//! - **Shareable writer** safe to use from broadcast tasks
//!
//! # Example
//!
//! ```ignore
//! use courier_ws::{accept, Connection, WebSocketConfig};
//!
//! let (stream, _) = listener.accept().await?;
//! let ws = accept(stream, WebSocketConfig::new().path("/ws")).await?;
//! let (mut reader, writer) = ws.into_split();
//! while let Ok(payload) = reader.read_message().await {
//!     // decode and dispatch
//! }
//! writer.close().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/courier-ws/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod transport;

pub use config::WebSocketConfig;
pub use connection::{accept, ConnectionId, WebSocket, WebSocketReader, WebSocketSender};
pub use error::{CloseCode, WsError, WsResult};
pub use message::{CloseFrame, Message};
pub use transport::{Connection, ConnectionReader, ConnectionWriter};
