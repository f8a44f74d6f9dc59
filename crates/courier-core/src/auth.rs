//! Authentication records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of a passed authentication challenge.
///
/// Several sessions may carry the same `id`; that is how one user holds
/// multiple connections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Authentication {
    /// User identifier.
    pub id: String,
    /// Application data attached by the authenticator.
    #[serde(default)]
    pub data: Value,
}

impl Authentication {
    /// Create a record with no attached data.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Value::Null,
        }
    }

    /// Attach application data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Authentication methods a channel can challenge with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// Username and password, answered with `edd:auth:basic`.
    Basic,
}

impl AuthMethod {
    /// Wire name advertised in challenges.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "edd:auth:basic",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authentication_serde() {
        let auth = Authentication::new("u1").with_data(json!({"role": "admin"}));
        let value = serde_json::to_value(&auth).unwrap();
        assert_eq!(value, json!({"id": "u1", "data": {"role": "admin"}}));
    }

    #[test]
    fn test_method_name_matches_event() {
        use crate::{protocol::BasicAuth, Event};
        assert_eq!(AuthMethod::Basic.as_str(), BasicAuth::ALIAS);
    }
}
