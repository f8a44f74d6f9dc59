//! Typed events and inbound event sets.
//!
//! Every payload that crosses a channel implements [`Event`]. The trait
//! carries the event's internal name, its wire-visible protocol alias and
//! two directional checks: fields that only the server may fill must be
//! unset on received events, and fields that only clients may fill must
//! be unset on sent events.
//!
//! A channel's inbound traffic is a closed set of events. [`InboundEvents`]
//! decodes an [`Envelope`] into that set and the [`inbound_events!`]
//! macro declares one:
//!
//! ```
//! use courier_core::{inbound_events, Event, InboundEvents, Envelope};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Ping { id: i64 }
//!
//! impl Event for Ping {
//!     const NAME: &'static str = "ping";
//! }
//!
//! inbound_events! {
//!     #[derive(Debug)]
//!     enum PingPongEvent {
//!         Ping(Ping),
//!     }
//! }
//!
//! let envelope = Envelope::new("pingpong", "ping", serde_json::json!({"id": 1}));
//! let event = PingPongEvent::decode_envelope("pingpong", envelope).unwrap();
//! assert_eq!(event.event_name(), "ping");
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult};

/// A typed payload carried by an envelope.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Internal event name.
    const NAME: &'static str;

    /// Wire-visible name. Defaults to [`Event::NAME`].
    const ALIAS: &'static str = Self::NAME;

    /// Reject fields that only clients may set. Runs before encoding.
    fn check_send_fields(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Reject fields that only the server may set. Runs after decoding.
    fn check_received_fields(&self) -> CoreResult<()> {
        Ok(())
    }
}

/// A closed set of events a channel accepts from clients.
pub trait InboundEvents: Sized + Send + 'static {
    /// Decode an envelope into one of the variants.
    ///
    /// Unknown event names yield [`CoreError::MissingHandler`].
    fn decode_envelope(channel: &str, envelope: Envelope) -> CoreResult<Self>;

    /// Internal name of the decoded event.
    fn event_name(&self) -> &'static str;
}

/// Inbound set for channels that accept nothing from clients.
#[derive(Debug)]
pub enum NoEvents {}

impl InboundEvents for NoEvents {
    fn decode_envelope(channel: &str, envelope: Envelope) -> CoreResult<Self> {
        Err(CoreError::missing_handler(channel, envelope.name))
    }

    fn event_name(&self) -> &'static str {
        match *self {}
    }
}

/// Declare an enum of inbound events and implement [`InboundEvents`] for it.
///
/// Each variant wraps exactly one [`Event`] type. Decoding matches the
/// envelope name against each type's protocol alias and falls back to a
/// missing handler error.
#[macro_export]
macro_rules! inbound_events {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident($ty:ty) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant($ty) ),+
        }

        impl $crate::InboundEvents for $name {
            fn decode_envelope(
                channel: &str,
                envelope: $crate::Envelope,
            ) -> $crate::CoreResult<Self> {
                $(
                    if envelope.name == <$ty as $crate::Event>::ALIAS {
                        return envelope.into_event::<$ty>().map(Self::$variant);
                    }
                )+
                Err($crate::CoreError::missing_handler(channel, envelope.name))
            }

            fn event_name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => <$ty as $crate::Event>::NAME ),+
                }
            }
        }
    };
}

/// Values that can be "absent" for directional field checks.
pub trait Unset {
    /// Whether the value is absent or zero.
    fn is_unset(&self) -> bool;
}

impl<T> Unset for Option<T> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

impl Unset for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Unset for bool {
    fn is_unset(&self) -> bool {
        !*self
    }
}

impl Unset for Value {
    fn is_unset(&self) -> bool {
        self.is_null()
    }
}

impl<T> Unset for Vec<T> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Unset for HashMap<K, V, S> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Unset for BTreeMap<K, V> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<T, S> Unset for HashSet<T, S> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! unset_for_numbers {
    ($($t:ty),*) => {
        $(
            impl Unset for $t {
                fn is_unset(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

unset_for_numbers!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Unset for f64 {
    fn is_unset(&self) -> bool {
        *self == 0.0
    }
}

/// Helpers for [`Event::check_send_fields`] and [`Event::check_received_fields`].
pub mod direction {
    use super::Unset;
    use crate::error::{CoreError, CoreResult};

    /// A field only the server may set: must be unset on received events.
    pub fn server_only<V: Unset + ?Sized>(event: &str, field: &str, value: &V) -> CoreResult<()> {
        if value.is_unset() {
            Ok(())
        } else {
            Err(CoreError::received_fields(event, field))
        }
    }

    /// A field only clients may set: must be unset on sent events.
    pub fn client_only<V: Unset + ?Sized>(event: &str, field: &str, value: &V) -> CoreResult<()> {
        if value.is_unset() {
            Ok(())
        } else {
            Err(CoreError::send_fields(event, field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<u64>,
        text: String,
    }

    impl Event for Message {
        const NAME: &'static str = "message";

        fn check_received_fields(&self) -> CoreResult<()> {
            direction::server_only(Self::NAME, "user_id", &self.user_id)
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Rename {
        name: String,
    }

    impl Event for Rename {
        const NAME: &'static str = "Rename";
        const ALIAS: &'static str = "rename";
    }

    inbound_events! {
        #[derive(Debug, PartialEq)]
        enum ChatEvent {
            Message(Message),
            Rename(Rename),
        }
    }

    #[test]
    fn test_alias_defaults_to_name() {
        assert_eq!(Message::ALIAS, "message");
        assert_eq!(Rename::ALIAS, "rename");
    }

    #[test]
    fn test_decode_by_alias() {
        let envelope = Envelope::new("chat", "rename", json!({"name": "bob"}));
        let event = ChatEvent::decode_envelope("chat", envelope).unwrap();
        assert_eq!(
            event,
            ChatEvent::Rename(Rename {
                name: "bob".to_string()
            })
        );
        assert_eq!(event.event_name(), "Rename");
    }

    #[test]
    fn test_decode_unknown_event() {
        let envelope = Envelope::new("chat", "shout", json!({}));
        let err = ChatEvent::decode_envelope("chat", envelope).unwrap_err();
        assert_eq!(err, CoreError::missing_handler("chat", "shout"));
    }

    #[test]
    fn test_decode_rejects_server_only_field() {
        let envelope = Envelope::new("chat", "message", json!({"user_id": 3, "text": "hi"}));
        let err = ChatEvent::decode_envelope("chat", envelope).unwrap_err();
        assert_eq!(err, CoreError::received_fields("message", "user_id"));
    }

    #[test]
    fn test_no_events_always_missing() {
        let envelope = Envelope::new("presence", "anything", Value::Null);
        assert!(NoEvents::decode_envelope("presence", envelope).is_err());
    }

    #[test]
    fn test_unset_values() {
        assert!(None::<u8>.is_unset());
        assert!(String::new().is_unset());
        assert!(0_u64.is_unset());
        assert!(!5_i32.is_unset());
        assert!(Vec::<u8>::new().is_unset());
        assert!(Value::Null.is_unset());
        assert!(!json!({}).is_unset());
    }

    #[test]
    fn test_client_only_check() {
        assert!(direction::client_only("login", "token", &None::<String>).is_ok());
        let err = direction::client_only("login", "token", &Some("t".to_string())).unwrap_err();
        assert_eq!(err, CoreError::send_fields("login", "token"));
    }
}
