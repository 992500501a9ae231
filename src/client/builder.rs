use super::core::InferenceClient;
use super::handlers::EventHandlers;
use crate::transport::{HttpTransport, TransportConfig};
use crate::types::TempInferStats;
use crate::{Error, ErrorContext, Result};
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://localhost:5143";

/// Builder for [`InferenceClient`].
///
/// Unset values fall back to the environment:
/// - `GOINFER_SERVER_URL` (default `http://localhost:5143`)
/// - `GOINFER_API_KEY` (required)
/// - `GOINFER_HTTP_TIMEOUT_SECS`, `GOINFER_HTTP_CONNECT_TIMEOUT_SECS`, `GOINFER_PROXY_URL`
pub struct InferenceClientBuilder {
    server_url: Option<String>,
    api_key: Option<String>,
    transport: TransportConfig,
    handlers: EventHandlers,
}

impl InferenceClientBuilder {
    pub fn new() -> Self {
        Self {
            server_url: None,
            api_key: None,
            transport: TransportConfig::from_env(),
            handlers: EventHandlers::default(),
        }
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Total timeout for buffered requests (model loads included).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.transport.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport.connect_timeout = timeout;
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.transport.proxy_url = Some(url.into());
        self
    }

    pub fn handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn on_token(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_token(f);
        self
    }

    pub fn on_start_emit(mut self, f: impl Fn(&TempInferStats) + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_start_emit(f);
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_error(f);
        self
    }

    pub fn build(self) -> Result<InferenceClient> {
        let server_url = self
            .server_url
            .or_else(|| std::env::var("GOINFER_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        validate_server_url(&server_url)?;

        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOINFER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new()
                        .with_field_path("GOINFER_API_KEY")
                        .with_source("client_builder"),
                )
            })?;

        let transport = HttpTransport::new(&server_url, &api_key, &self.transport)?;
        tracing::debug!(server_url = server_url.as_str(), "goinfer client created");
        Ok(InferenceClient::from_parts(transport, self.handlers))
    }
}

impl Default for InferenceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_server_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid server url: {}", e),
            ErrorContext::new()
                .with_field_path("server_url")
                .with_details(raw.to_string())
                .with_source("client_builder"),
        )
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::configuration_with_context(
            format!("unsupported url scheme '{}'", other),
            ErrorContext::new()
                .with_field_path("server_url")
                .with_details(raw.to_string())
                .with_source("client_builder"),
        )),
    }
}
