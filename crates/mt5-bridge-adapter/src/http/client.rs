/*
[INPUT]:  HTTP configuration (gateway base URL, timeouts, session token)
[OUTPUT]: Configured reqwest client ready for terminal gateway calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
[UPDATE]: 2026-10-18 Percent-encoded path segments for symbol routes
*/

use crate::http::{Result, TerminalError};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;

/// Default address of a locally running terminal gateway
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8228";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for a terminal gateway exposing the MT5 Web API shape
#[derive(Debug)]
pub struct TerminalClient {
    http_client: Client,
    base_url: Url,
    session_id: RwLock<Option<String>>,
}

impl TerminalClient {
    /// Create a new client against the default local gateway
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default(), DEFAULT_GATEWAY_URL)
    }

    /// Create a new client with custom configuration and base URL
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
            session_id: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session id issued by the last successful login
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn set_session_id(&self, session_id: Option<String>) {
        if let Ok(mut guard) = self.session_id.write() {
            *guard = session_id;
        }
    }

    /// Build request builder for an endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder carrying the session bearer token
    pub(crate) fn session_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let session_id = self.session_id().ok_or(TerminalError::NoSession)?;
        Ok(self.request(method, endpoint)?.bearer_auth(session_id))
    }

    /// Session request whose path is built from raw segments; each one is
    /// percent-encoded so symbols like `US30#` or `EUR/USD.m` stay one segment.
    pub(crate) fn session_segments_request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder> {
        let session_id = self.session_id().ok_or(TerminalError::NoSession)?;
        let mut endpoint = self.base_url.join("/")?;
        endpoint
            .path_segments_mut()
            .map_err(|_| TerminalError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .clear()
            .extend(segments);
        Ok(self.http_client.request(method, endpoint).bearer_auth(session_id))
    }

    /// Send a request and decode the JSON body, mapping non-2xx to `Gateway`
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TerminalError::gateway(status, body));
        }
        serde_json::from_str(&body).map_err(TerminalError::from)
    }

    /// Like `send_json`, but a 404 means "nothing there" rather than an error
    pub(crate) async fn send_optional_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        match self.send_json(builder).await {
            Ok(value) => Ok(Some(value)),
            Err(TerminalError::Gateway { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
