use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{Proxy, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::time::Duration;
use tracing::debug;

/// Timeouts and proxy settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total timeout for buffered requests. Streams are not bound by it.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl TransportConfig {
    /// Defaults, overridable from the environment:
    /// - `GOINFER_HTTP_TIMEOUT_SECS` (default 300)
    /// - `GOINFER_HTTP_CONNECT_TIMEOUT_SECS` (default 10)
    /// - `GOINFER_PROXY_URL`
    pub fn from_env() -> Self {
        let request_timeout = env::var("GOINFER_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);
        let connect_timeout = env::var("GOINFER_HTTP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        Self {
            request_timeout: Duration::from_secs(request_timeout.max(1)),
            connect_timeout: Duration::from_secs(connect_timeout.max(1)),
            proxy_url: env::var("GOINFER_PROXY_URL").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Canonical reason phrase for the status ("Internal Server Error", ...).
    pub fn status_text(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Best-effort extraction of a string field from a JSON error body,
    /// falling back to the raw body.
    pub fn text_field(&self, field: &str) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get(field).and_then(|s| s.as_str()).map(str::to_string))
            .unwrap_or_else(|| self.body.trim().to_string())
    }
}

/// Authenticated reqwest wrapper bound to one Goinfer server.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str, config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url: {}", e),
                    ErrorContext::new()
                        .with_field_path("GOINFER_PROXY_URL")
                        .with_details(proxy_url.clone())
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<Reply> {
        debug!(method = "GET", path, "goinfer request");
        let req = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout);
        Self::read(req).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Reply> {
        debug!(method = "POST", path, "goinfer request");
        let req = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(body);
        Self::read(req).await
    }

    /// Open a server-sent-event response.
    ///
    /// Non-2xx responses are read fully and returned as `Err(reply)` so the caller
    /// can decode the server's error payload.
    pub async fn post_stream<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<std::result::Result<BoxStream<'static, Bytes>, Reply>> {
        debug!(method = "POST", path, stream = true, "goinfer request");
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header("accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(Err(Reply { status, body }));
        }

        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Ok(Box::pin(byte_stream)))
    }

    async fn read(req: reqwest::RequestBuilder) -> Result<Reply> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        Ok(Reply { status, body })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
