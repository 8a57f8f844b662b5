use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const LIVE_PREFIX: &str = "docwal_live_";
pub const TEST_PREFIX: &str = "docwal_test_";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEnvironment {
    Live,
    Test,
}

/// A full API key secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Which environment the key prefix points at. The service enforces this, not the client.
    pub fn environment(&self) -> Option<KeyEnvironment> {
        if self.0.starts_with(LIVE_PREFIX) {
            Some(KeyEnvironment::Live)
        } else if self.0.starts_with(TEST_PREFIX) {
            Some(KeyEnvironment::Test)
        } else {
            None
        }
    }

    pub fn is_masked(&self) -> bool {
        is_masked(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"<redacted>").finish()
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// True if `key` looks like a redacted display form rather than a secret.
pub fn is_masked(key: &str) -> bool {
    key.contains(['*', '•', '…']) || key.contains("...")
}

/// Response to `generate` and `regenerate`: the only time the full key is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct GeneratedApiKey {
    pub api_key: ApiKey,
    pub created_at: Option<DateTime<Utc>>,
    pub warning: Option<String>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Key metadata. The masked key is read from whichever of `masked_key`,
/// `api_key`, `key` or `api_key_masked` the service sends first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawApiKeyInfo")]
#[non_exhaustive]
pub struct ApiKeyInfo {
    pub masked_key: Option<String>,
    pub has_api_key: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawApiKeyInfo {
    masked_key: Option<String>,
    api_key: Option<String>,
    key: Option<String>,
    api_key_masked: Option<String>,
    has_api_key: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    last_used: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawApiKeyInfo> for ApiKeyInfo {
    fn from(raw: RawApiKeyInfo) -> Self {
        Self {
            masked_key: raw.masked_key.or(raw.api_key).or(raw.key).or(raw.api_key_masked),
            has_api_key: raw.has_api_key,
            created_at: raw.created_at,
            last_used_at: raw.last_used_at.or(raw.last_used),
            extra: raw.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment() {
        assert_eq!(ApiKey::from("docwal_live_abc123").environment(), Some(KeyEnvironment::Live));
        assert_eq!(ApiKey::from("docwal_test_abc123").environment(), Some(KeyEnvironment::Test));
        assert_eq!(ApiKey::from("sk_abc").environment(), None);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::from("docwal_live_supersecret");
        assert!(!format!("{key:?}").contains("supersecret"));
    }

    #[test]
    fn test_masked() {
        assert!(is_masked("docwal_live_****1234"));
        assert!(is_masked("docwal_live_ab...34"));
        assert!(!is_masked("docwal_live_abcdef1234"));

        let info: ApiKeyInfo =
            serde_json::from_str(r#"{"api_key": "docwal_live_****1234", "last_used": null}"#)
                .expect("failed to deserialize key info");
        assert_eq!(info.masked_key.as_deref(), Some("docwal_live_****1234"));
        assert_eq!(info.last_used_at, None);
    }

    #[test]
    fn test_masked_key_under_several_names() {
        let info: ApiKeyInfo = serde_json::from_str(
            r#"{
                "api_key": "docwal_live_****1234",
                "api_key_masked": "docwal_live_****1234",
                "last_used": "2024-05-16T08:30:00Z",
                "last_used_at": null,
                "scopes": ["credentials"]
            }"#,
        )
        .expect("failed to deserialize key info");
        assert_eq!(info.masked_key.as_deref(), Some("docwal_live_****1234"));
        assert!(info.last_used_at.is_some());
        assert_eq!(info.extra["scopes"][0], "credentials");
        assert!(!info.extra.contains_key("api_key_masked"));
    }
}
