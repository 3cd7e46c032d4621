//! Layered configuration: defaults, then an optional YAML file, then
//! environment variables.
//!
//! ```yaml
//! mcp:
//!   url: http://localhost:8000/sse
//!   transport: sse
//! anthropic:
//!   base_url: https://api.anthropic.com
//! chat:
//!   model: claude-3-5-sonnet-20241022
//!   max_tokens: 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::drivers::anthropic::DEFAULT_API_VERSION;
use crate::error::{Error, ErrorContext};
use crate::mcp::{McpServerSpec, McpTransportKind};
use crate::Result;

pub const CONFIG_PATH_ENV: &str = "MCP_CHAT_CONFIG";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub mcp: McpServerSpec,
    pub anthropic: AnthropicSettings,
    pub chat: ChatSettings,
}

/// Messages API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    /// Explicit key. Never written back out; prefer the keyring or `ANTHROPIC_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub proxy_url: Option<String>,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: 30,
            proxy_url: None,
        }
    }
}

/// Per-conversation defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    /// 1 dispatches tool calls one at a time; larger values run them concurrently.
    pub dispatch_concurrency: usize,
    /// Re-send the tool list (with `tool_choice: none`) on the follow-up request.
    pub follow_up_tools: bool,
    pub system_prompt: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            dispatch_concurrency: 1,
            follow_up_tools: false,
            system_prompt: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration: defaults, then `path` (or `$MCP_CHAT_CONFIG`), then
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading config file");
        Self::from_yaml_str(&raw).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_source(path.display().to_string()),
            },
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid config: {}", e),
                ErrorContext::new().with_details("yaml"),
            )
        })
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MCP_SERVER_URL") {
            self.mcp.url = v;
        }
        if let Some(v) = lookup("MCP_TRANSPORT") {
            self.mcp.transport = v.parse()?;
        }
        if let Some(v) = parse_var(&lookup, "MCP_HTTP_TIMEOUT_SECS")? {
            self.mcp.http_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "MCP_SSE_READ_TIMEOUT_SECS")? {
            self.mcp.sse_read_timeout_secs = v;
        }
        if let Some(v) = lookup("ANTHROPIC_BASE_URL") {
            self.anthropic.base_url = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_HTTP_TIMEOUT_SECS")? {
            self.anthropic.timeout_secs = v;
        }
        if let Some(v) = lookup("AI_PROXY_URL") {
            self.anthropic.proxy_url = Some(v);
        }
        if let Some(v) = lookup("MCP_CHAT_MODEL") {
            self.chat.model = v;
        }
        if let Some(v) = parse_var(&lookup, "MCP_CHAT_MAX_TOKENS")? {
            self.chat.max_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "MCP_DISPATCH_CONCURRENCY")? {
            self.chat.dispatch_concurrency = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.mcp.url).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid MCP server URL: {}", e),
                ErrorContext::new().with_field_path("mcp.url"),
            )
        })?;
        url::Url::parse(&self.anthropic.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid Messages API base URL: {}", e),
                ErrorContext::new().with_field_path("anthropic.base_url"),
            )
        })?;
        if self.chat.max_tokens == 0 {
            return Err(Error::configuration_with_context(
                "max_tokens must be positive",
                ErrorContext::new().with_field_path("chat.max_tokens"),
            ));
        }
        if self.chat.dispatch_concurrency == 0 {
            return Err(Error::configuration_with_context(
                "dispatch_concurrency must be at least 1",
                ErrorContext::new().with_field_path("chat.dispatch_concurrency"),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("Cannot parse {}={:?}", key, raw),
                ErrorContext::new().with_source("environment"),
            )
        }),
    }
}

impl std::str::FromStr for McpTransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sse" => Ok(McpTransportKind::Sse),
            "streamable_http" | "streamable-http" | "http" => Ok(McpTransportKind::StreamableHttp),
            other => Err(Error::configuration_with_context(
                format!("Unsupported MCP transport: {}. Supported: sse, streamable_http", other),
                ErrorContext::new().with_field_path("mcp.transport"),
            )),
        }
    }
}
