//! # Courier Core
//!
//! Transport-free building blocks shared by every Courier crate:
//!
//! - [`Codec`] - pluggable wire encoding ([`JsonCodec`] by default)
//! - [`Envelope`] - the `{channel, name, body}` wire wrapper
//! - [`Event`] - typed payloads with directional field checks
//! - [`InboundEvents`] - a channel's closed set of client events
//! - [`protocol`] - reserved auth, presence, room and error events
//! - [`Authentication`] - the record produced by an auth challenge
//!
//! ## Example
//!
//! ```
//! use courier_core::{Envelope, JsonCodec, protocol::UserJoin};
//!
//! let envelope = Envelope::from_event("lobby", &UserJoin { id: "42".into() }).unwrap();
//! let bytes = envelope.encode(&JsonCodec).unwrap();
//! let decoded = Envelope::decode(&JsonCodec, &bytes).unwrap();
//!
//! assert_eq!(decoded.name, "edd:user:join");
//! let join: UserJoin = decoded.into_event().unwrap();
//! assert_eq!(join.id, "42");
//! ```

#![doc(html_root_url = "https://docs.rs/courier-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod event;
pub mod protocol;

pub use auth::{AuthMethod, Authentication};
pub use codec::{decode_from, encode_to, Codec, JsonCodec};
pub use envelope::Envelope;
pub use error::{CoreError, CoreResult};
pub use event::{direction, Event, InboundEvents, NoEvents, Unset};
