//! Anthropic Messages API 驱动 — 请求/响应格式转换
//!
//! Anthropic Messages API driver. Wire-format notes:
//! - System text is a top-level `system` parameter, not part of `messages`.
//! - Content uses typed blocks: `[{"type": "text", "text": "..."}]`.
//! - `max_tokens` is required.
//! - Errors come back as `{"type": "error", "error": {"type": "...", "message": "..."}}`.

use serde_json::Value;
use std::collections::HashMap;

use crate::client::error_classification::{class_from_status, is_retryable_class};
use crate::error::{Error, ErrorContext};

use super::{DriverRequest, MessagesRequest, MessagesResponse};

pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const MESSAGES_PATH: &str = "/v1/messages";

/// Anthropic Messages API driver.
#[derive(Debug, Clone)]
pub struct AnthropicDriver {
    base_url: String,
    api_version: String,
}

impl AnthropicDriver {
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
        }
    }

    pub fn build_request(&self, request: &MessagesRequest) -> Result<DriverRequest, Error> {
        let body = serde_json::to_value(request)?;

        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), self.api_version.clone());

        Ok(DriverRequest {
            url: format!("{}{}", self.base_url, MESSAGES_PATH),
            headers,
            body,
        })
    }

    pub fn parse_response(&self, body: &Value) -> Result<MessagesResponse, Error> {
        if body.get("type").and_then(Value::as_str) == Some("error") {
            // Some gateways answer 200 with an error envelope.
            return Err(self.parse_error(200, body));
        }
        serde_json::from_value(body.clone()).map_err(|e| {
            Error::completion_with_context(
                format!("Malformed Messages API response: {}", e),
                ErrorContext::new().with_source("anthropic_driver"),
            )
        })
    }

    /// Map a non-success HTTP response to [`Error::Remote`].
    pub fn parse_error(&self, status: u16, body: &Value) -> Error {
        let error_type = body.pointer("/error/type").and_then(Value::as_str);
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| match body {
                Value::String(s) => s.clone(),
                Value::Null => format!("HTTP {}", status),
                other => other.to_string(),
            });
        let class = class_from_status(status, error_type);
        Error::Remote {
            status,
            retryable: is_retryable_class(class),
            class: class.to_string(),
            message,
        }
    }
}

impl Default for AnthropicDriver {
    fn default() -> Self {
        Self::new("https://api.anthropic.com", DEFAULT_API_VERSION)
    }
}
