use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier minted per flow attempt.
///
/// The token is embedded in every return URL handed to the external agent and persisted with
/// the pending request; a resumption is only accepted when both agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Mints a fresh token from 16 random bytes, URL-safe encoded.
    pub fn mint() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(b64.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks a value echoed back by an external agent.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl From<&str> for CorrelationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
