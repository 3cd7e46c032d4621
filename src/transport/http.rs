use crate::config::AnthropicSettings;
use crate::drivers::DriverRequest;
use crate::Result;
use keyring::Entry;
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;

pub const KEYRING_SERVICE: &str = "mcp-chat-bridge";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// HTTP transport for the Messages API.
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &AnthropicSettings) -> Result<Self> {
        let api_key = Self::get_api_key(settings.api_key.as_deref());

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = settings.proxy_url.as_deref() {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                crate::Error::configuration(format!("Invalid proxy URL {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client, api_key })
    }

    /// Resolve the API key: explicit value, then OS keyring, then environment.
    pub fn get_api_key(explicit: Option<&str>) -> Option<String> {
        if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
            return Some(key.to_string());
        }

        // 1. Try Keyring
        if let Ok(entry) = Entry::new(KEYRING_SERVICE, "anthropic") {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        // 2. Try Environment Variable
        env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST a JSON body and return the status with the decoded body.
    ///
    /// Bodies that are not JSON come back as `Value::String`; an empty body
    /// comes back as `Value::Null`. Status interpretation is the caller's job.
    pub async fn post_json(&self, request: &DriverRequest) -> Result<(u16, Value)> {
        let mut req = self.client.post(&request.url).json(&request.body);

        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }

        let response = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        debug!(status, bytes = text.len(), url = %request.url, "messages api response");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Other(_) => false,
        }
    }
}
