use std::env;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use api_keys::ApiKeys;
use credentials::Credentials;
use http::Http;
use team::Team;
use templates::Templates;

use crate::model::api_key::ApiKey;
use crate::Error;

pub const DEFAULT_BASE_URL: &str = "https://docwal.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("docwal-rust/", env!("CARGO_PKG_VERSION"));

pub const API_KEY_ENV: &str = "DOCWAL_API_KEY";
pub const BASE_URL_ENV: &str = "DOCWAL_BASE_URL";
pub const TIMEOUT_ENV: &str = "DOCWAL_TIMEOUT";

/// Connection settings, fixed once a [`Client`] is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Reads `DOCWAL_API_KEY` (required), `DOCWAL_BASE_URL` and `DOCWAL_TIMEOUT` (seconds).
    pub fn from_env() -> Result<Self, Error> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::precondition("api_key", format!("{API_KEY_ENV} is not set")))?;

        let mut config = Self::new(api_key);

        if let Ok(url) = env::var(BASE_URL_ENV) {
            config.base_url = Url::parse(url.trim())?;
        }

        if let Ok(secs) = env::var(TIMEOUT_ENV) {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                Error::precondition("timeout", format!("{TIMEOUT_ENV} must be a number of seconds"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

/// Builds a [`Client`], validating the base URL on [`build`](ClientBuilder::build).
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
    base_url: Option<String>,
}

impl ClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let mut config = self.config;
        if let Some(url) = self.base_url {
            config.base_url = Url::parse(url.trim())?;
        }
        Client::from_config(config)
    }
}

/// Entry point to the DocWal API. Holds the transport and one client per resource.
///
/// Cloning is cheap and clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: Arc<Http>,
    credentials: Credentials,
    templates: Templates,
    team: Team,
    api_keys: ApiKeys,
}

impl Client {
    /// Creates a client for the production API with the default timeout.
    pub fn new(api_key: impl Into<ApiKey>) -> Result<Self, Error> {
        Self::from_config(ClientConfig::new(api_key))
    }

    pub fn builder(api_key: impl Into<ApiKey>) -> ClientBuilder {
        ClientBuilder {
            config: ClientConfig::new(api_key),
            base_url: None,
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, Error> {
        if config.api_key.expose().trim().is_empty() {
            return Err(Error::precondition("api_key", "API key must not be empty"));
        }
        if config.api_key.environment().is_none() {
            log::warn!("API key does not have a recognized docwal_live_/docwal_test_ prefix");
        }

        let http = Arc::new(Http::new(&config)?);
        log::debug!("created DocWal client for {}", http.base_url());

        Ok(Self {
            credentials: Credentials::new(http.clone()),
            templates: Templates::new(http.clone()),
            team: Team::new(http.clone()),
            api_keys: ApiKeys::new(http.clone()),
            http,
        })
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn api_keys(&self) -> &ApiKeys {
        &self.api_keys
    }
}

impl AsRef<Http> for Client {
    fn as_ref(&self) -> &Http {
        &self.http
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::precondition(field, format!("{field} must not be empty")));
    }
    Ok(())
}

/// Checks that an identifier is usable as a single path segment.
///
/// Other reserved characters are percent-encoded when the URL is built.
pub(crate) fn segment<'a>(field: &str, id: &'a str) -> Result<&'a str, Error> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::precondition(field, format!("{field} must not be empty")));
    }
    let dots = id.to_ascii_lowercase().replace("%2e", ".");
    if id.contains('/') || matches!(dots.as_str(), "." | "..") {
        return Err(Error::precondition(field, format!("{field} is not a valid identifier")));
    }
    Ok(id)
}

pub mod api_keys;
pub mod credentials;
pub mod http;
pub mod team;
pub mod templates;

#[cfg(test)]
pub(crate) mod tests {
    use serial_test::serial;

    use super::*;
    use crate::errors::ErrorKind;

    pub fn make_client(url: Url) -> Client {
        Client::from_config(http::tests::make_config(url)).expect("failed to create client")
    }

    #[test]
    fn test_defaults() {
        let client = Client::new("docwal_live_abc").expect("failed to create client");
        assert_eq!(client.http().base_url().as_str(), "https://docwal.com/api");
        assert_eq!(client.http().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let client = Client::builder("docwal_test_abc")
            .base_url("https://sandbox.docwal.com/api/")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to create client");
        assert_eq!(client.http().base_url().host_str(), Some("sandbox.docwal.com"));
        assert_eq!(client.http().timeout(), Duration::from_secs(5));

        let err = Client::builder("docwal_test_abc")
            .base_url("not a url")
            .build()
            .expect_err("bad URL should fail");
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = Client::new("  ").expect_err("empty key should fail");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_independent_clients() {
        let live = Client::new("docwal_live_abc").expect("failed to create client");
        let sandbox = Client::builder("docwal_test_abc")
            .base_url("http://localhost:8000/api")
            .build()
            .expect("failed to create client");
        assert_ne!(live.http().base_url(), sandbox.http().base_url());
    }

    #[test]
    #[serial(env)]
    fn test_from_env() {
        env::set_var(API_KEY_ENV, "docwal_test_fromenv");
        env::set_var(BASE_URL_ENV, "http://localhost:9000/api");
        env::set_var(TIMEOUT_ENV, "12");

        let config = ClientConfig::from_env().expect("failed to read env");
        assert_eq!(config.api_key.expose(), "docwal_test_fromenv");
        assert_eq!(config.base_url.as_str(), "http://localhost:9000/api");
        assert_eq!(config.timeout, Duration::from_secs(12));

        env::set_var(TIMEOUT_ENV, "soon");
        assert!(ClientConfig::from_env().is_err());

        env::remove_var(API_KEY_ENV);
        env::remove_var(BASE_URL_ENV);
        env::remove_var(TIMEOUT_ENV);
        let err = ClientConfig::from_env().expect_err("missing key should fail");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_segment() {
        assert_eq!(segment("doc_id", " DOC-1 ").expect("valid id"), "DOC-1");
        assert!(segment("doc_id", "").is_err());
        assert!(segment("doc_id", "../admin").is_err());
        assert!(segment("doc_id", "..").is_err());
        assert!(segment("doc_id", " . ").is_err());
        assert!(segment("doc_id", "%2E%2e").is_err());
        assert_eq!(segment("doc_id", "a%b").expect("valid id"), "a%b");
    }
}
