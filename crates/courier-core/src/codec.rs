//! Pluggable wire codecs.
//!
//! A [`Codec`] turns the structured [`Value`] model into bytes and back.
//! Typed payloads travel through that model via [`encode_to`] and
//! [`decode_from`], which keeps the trait object safe so a server can
//! hold an `Arc<dyn Codec>` chosen at start-up.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Encodes and decodes structured values for the wire.
pub trait Codec: Send + Sync + fmt::Debug + 'static {
    /// Short name used in logs (e.g. `json`).
    fn name(&self) -> &'static str;

    /// Encode a value into bytes.
    fn encode(&self, value: &Value) -> CoreResult<Vec<u8>>;

    /// Decode bytes into a value.
    fn decode(&self, bytes: &[u8]) -> CoreResult<Value>;

    /// Whether encoded payloads should be framed as binary messages.
    fn is_binary(&self) -> bool {
        false
    }
}

/// JSON codec, the default wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CoreError::encode("json value", e))
    }

    fn decode(&self, bytes: &[u8]) -> CoreResult<Value> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::decode("json value", e))
    }
}

/// Encode a typed value through a codec.
pub fn encode_to<T: Serialize + ?Sized>(codec: &dyn Codec, value: &T) -> CoreResult<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| CoreError::encode("value", e))?;
    codec.encode(&value)
}

/// Decode a typed value through a codec.
pub fn decode_from<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> CoreResult<T> {
    let value = codec.decode(bytes)?;
    serde_json::from_value(value).map_err(|e| CoreError::decode("value", e))
}
