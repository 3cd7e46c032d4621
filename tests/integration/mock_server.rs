//! Mock HTTP server setup for integration tests

use mcp_chat_bridge::{AnthropicClient, AnthropicClientBuilder};
use mockito::{Matcher, Mock, Request, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const SESSION_ID: &str = "sess-1";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Streamable HTTP MCP endpoint on this server.
    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.base_url)
    }

    /// Messages API client pointed at this server.
    pub fn anthropic_client(&self) -> AnthropicClient {
        AnthropicClientBuilder::new()
            .api_key("sk-test")
            .base_url(&self.base_url)
            .timeout_secs(5)
            .build()
            .expect("client")
    }

    /// Messages API response for requests whose body matches `body_regex`.
    pub async fn mock_messages(&self, body_regex: &str, status: usize, body: Value) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::Regex(body_regex.to_string()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// `initialize`, `notifications/initialized`, `tools/list` and the
    /// optional `GET` stream (refused) for an MCP server exposing `tools`.
    /// The mocks live as long as the returned values.
    pub async fn mock_mcp_server(&self, tools: Value) -> Vec<Mock> {
        let mut server = self.server.lock().await;
        let initialize = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "initialize"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("mcp-session-id", SESSION_ID)
            .with_body_from_request(rpc_reply(json!({
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": "weather", "version": "1.0.0"}
                }
            })))
            .create_async()
            .await;
        let initialized = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "notifications/initialized"})))
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(202)
            .create_async()
            .await;
        let stream = server
            .mock("GET", "/mcp")
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(405)
            .create_async()
            .await;
        let list = server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "tools/list"})))
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(rpc_reply(json!({"result": {"tools": tools}})))
            .create_async()
            .await;
        vec![initialize, initialized, stream, list]
    }

    /// JSON answer to `tools/call` with the given arguments.
    pub async fn mock_tool_call(&self, arguments: Value, text: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({
                "method": "tools/call",
                "params": {"name": "get_weather", "arguments": arguments}
            })))
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(rpc_reply(json!({
                "result": {"content": [{"type": "text", "text": text}], "isError": false}
            })))
            .expect(1)
            .create_async()
            .await
    }

    /// Session release, issued once the session is stopped or dropped.
    pub async fn mock_session_delete(&self) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("DELETE", "/mcp")
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(200)
            .expect(1)
            .create_async()
            .await
    }
}

/// `id` of the JSON-RPC request in `request`'s body.
pub fn request_id(request: &Request) -> Value {
    request
        .body()
        .ok()
        .and_then(|body| serde_json::from_slice::<Value>(body).ok())
        .and_then(|message| message.get("id").cloned())
        .unwrap_or(Value::Null)
}

/// JSON-RPC response body carrying `outcome` (`result` or `error`) and the
/// request's id.
pub fn rpc_reply(outcome: Value) -> impl Fn(&Request) -> Vec<u8> + Send + Sync + 'static {
    move |request| {
        let mut reply = json!({"jsonrpc": "2.0", "id": request_id(request)});
        if let (Some(reply), Some(outcome)) = (reply.as_object_mut(), outcome.as_object()) {
            reply.extend(outcome.clone());
        }
        reply.to_string().into_bytes()
    }
}

/// Wait up to two seconds for `mock` to be hit; requests issued from
/// background tasks land after the call that triggered them returns.
pub async fn wait_until_matched(mock: &Mock) -> bool {
    for _ in 0..40 {
        if mock.matched_async().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

pub fn weather_tool() -> Value {
    json!({
        "name": "get_weather",
        "description": "Get the weather information for a specified city.",
        "inputSchema": {
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }
    })
}

/// Messages API response body.
pub fn completion(stop_reason: &str, content: Value) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": content,
        "stop_reason": stop_reason,
        "stop_sequence": null,
        "usage": {"input_tokens": 12, "output_tokens": 7}
    })
}
