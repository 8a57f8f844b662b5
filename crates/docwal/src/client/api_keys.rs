use std::sync::Arc;

use super::http::{Http, Request};
use crate::model::api_key::{ApiKeyInfo, GeneratedApiKey};
use crate::model::Message;
use crate::Error;

/// Management of the institution's API key. Owner or admin only.
///
/// The full key is returned by [`generate`](ApiKeys::generate) and
/// [`regenerate`](ApiKeys::regenerate) only; it cannot be fetched again later.
#[derive(Debug, Clone)]
pub struct ApiKeys {
    http: Arc<Http>,
}

impl ApiKeys {
    pub(crate) fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub async fn generate(&self) -> Result<GeneratedApiKey, Error> {
        self.http
            .send(Request::post("/institutions/api-keys/generate/"))
            .await
    }

    pub async fn info(&self) -> Result<ApiKeyInfo, Error> {
        self.http.send(Request::get("/institutions/api-keys/info/")).await
    }

    /// Revokes the current key and issues a new one.
    pub async fn regenerate(&self) -> Result<GeneratedApiKey, Error> {
        self.http
            .send(Request::post("/institutions/api-keys/regenerate/"))
            .await
    }

    pub async fn revoke(&self) -> Result<Message, Error> {
        self.http
            .send(Request::post("/institutions/api-keys/revoke/"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::client::http::tests::{MockResponse, MockServer};
    use crate::client::tests::make_client;
    use crate::model::api_key::{is_masked, KeyEnvironment};

    #[tokio::test]
    async fn test_generate_returns_full_key() {
        let server = MockServer::start(vec![MockResponse::json(
            201,
            json!({
                "api_key": "docwal_live_9f8e7d6c5b4a39281706",
                "created_at": "2024-05-15T10:00:00Z",
                "warning": "Store this key securely. It will not be shown again."
            }),
        )])
        .await;
        let client = make_client(server.url());

        let generated = client.api_keys().generate().await.expect("failed to generate key");
        assert_eq!(generated.api_key.environment(), Some(KeyEnvironment::Live));
        assert!(!generated.api_key.is_masked());
        assert!(generated.warning.is_some());
        assert_eq!(server.last_request().method, "POST");
        assert_eq!(server.last_request().path(), "/api/institutions/api-keys/generate/");
    }

    #[tokio::test]
    async fn test_info_is_masked() {
        let server = MockServer::start(vec![MockResponse::json(
            200,
            json!({
                "api_key": "docwal_live_****1706",
                "created_at": "2024-05-15T10:00:00Z",
                "last_used_at": "2024-05-16T08:30:00Z"
            }),
        )])
        .await;
        let client = make_client(server.url());

        let info = client.api_keys().info().await.expect("failed to get key info");
        assert!(info.masked_key.as_deref().is_some_and(is_masked));
        assert!(info.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_regenerate_and_revoke() {
        let server = MockServer::start(vec![
            MockResponse::json(200, json!({"api_key": "docwal_test_0011223344556677"})),
            MockResponse::json(200, json!({"message": "API key revoked"})),
        ])
        .await;
        let client = make_client(server.url());

        let regenerated = client.api_keys().regenerate().await.expect("failed to regenerate");
        assert_eq!(regenerated.api_key.environment(), Some(KeyEnvironment::Test));
        assert_eq!(server.last_request().path(), "/api/institutions/api-keys/regenerate/");

        let msg = client.api_keys().revoke().await.expect("failed to revoke");
        assert_eq!(msg.message.as_deref(), Some("API key revoked"));
    }
}
