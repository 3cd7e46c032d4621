//! MCP session over the legacy SSE transport.
//!
//! mockito cannot hold an event stream open while answering POSTs, so these
//! tests run a small HTTP/1.1 server on a local TCP socket.

use mcp_chat_bridge::mcp::{McpError, McpServerSpec};
use mcp_chat_bridge::{ErrorKind, McpSession, ToolSession};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Clone, Copy, Default)]
struct Behavior {
    /// Open the event stream but never send the `endpoint` event.
    no_endpoint: bool,
    /// Accept `tools/call` without ever answering it.
    silent_on_call: bool,
}

#[derive(Default)]
struct ServerState {
    stream: Mutex<Option<OwnedWriteHalf>>,
    /// Replies the client sent to server-initiated requests.
    replies: Mutex<Vec<Value>>,
}

struct SseServer {
    url: String,
    state: Arc<ServerState>,
}

impl SseServer {
    async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}/sse", listener.local_addr().expect("addr"));
        let state = Arc::new(ServerState::default());

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle_connection(socket, shared.clone(), behavior));
            }
        });
        Self { url, state }
    }

    async fn wait_for_reply(&self) -> Option<Value> {
        for _ in 0..50 {
            if let Some(reply) = self.state.replies.lock().await.first().cloned() {
                return Some(reply);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

async fn handle_connection(socket: TcpStream, state: Arc<ServerState>, behavior: Behavior) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    loop {
        // request line + headers
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
            return;
        }
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }

        if request_line.starts_with("GET /sse") {
            write
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\n\r\n")
                .await
                .expect("write headers");
            if !behavior.no_endpoint {
                write
                    .write_all(b"event: endpoint\ndata: /messages/?session_id=abc\n\n")
                    .await
                    .expect("write endpoint");
            }
            *state.stream.lock().await = Some(write);
            return;
        }

        write
            .write_all(b"HTTP/1.1 202 Accepted\r\ncontent-length: 8\r\n\r\nAccepted")
            .await
            .expect("write 202");

        let message: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        handle_message(&state, behavior, message).await;
    }
}

async fn handle_message(state: &ServerState, behavior: Behavior, message: Value) {
    let id = message.get("id").cloned();
    let method = message.get("method").and_then(Value::as_str).map(str::to_string);

    let (Some(id), Some(method)) = (id.clone(), method) else {
        if id.is_some() {
            state.replies.lock().await.push(message);
        }
        return;
    };

    let result = match method.as_str() {
        "initialize" => json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "weather", "version": "1.0.0"}
        }),
        "tools/list" => json!({
            "tools": [{
                "name": "get_weather",
                "description": "Get the weather information for a specified city.",
                "inputSchema": {"type": "object", "properties": {"city": {"type": "string"}}}
            }]
        }),
        "tools/call" => {
            if behavior.silent_on_call {
                return;
            }
            let city = message
                .pointer("/params/arguments/city")
                .and_then(Value::as_str)
                .unwrap_or("nowhere");
            json!({"content": [{"type": "text", "text": format!("The weather in {} is sunny.", city)}]})
        }
        _ => return,
    };

    let mut events = format!(
        "event: message\ndata: {}\n\n",
        json!({"jsonrpc": "2.0", "id": id, "result": result})
    );
    if method == "initialize" {
        events.push_str("event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":\"srv-1\",\"method\":\"ping\"}\n\n");
    }
    if let Some(stream) = state.stream.lock().await.as_mut() {
        let _ = stream.write_all(events.as_bytes()).await;
    }
}

#[tokio::test]
async fn test_sse_session_round_trip() {
    let server = SseServer::start(Behavior::default()).await;
    let session = McpSession::start(&McpServerSpec::sse(&server.url))
        .await
        .expect("session");

    assert_eq!(session.server_info().name, "weather");
    assert_eq!(session.catalog().len(), 1);

    let result = session
        .call_tool("get_weather", json!({"city": "Tokyo"}))
        .await
        .expect("tools/call");
    assert_eq!(
        result.content[0].text.as_deref(),
        Some("The weather in Tokyo is sunny.")
    );

    let reply = server.wait_for_reply().await.expect("ping reply");
    assert_eq!(reply["id"], "srv-1");
    assert_eq!(reply["result"], json!({}));

    session.stop().await;
}

#[tokio::test]
async fn test_unanswered_call_times_out() {
    let server = SseServer::start(Behavior {
        silent_on_call: true,
        ..Behavior::default()
    })
    .await;
    let spec = McpServerSpec {
        sse_read_timeout_secs: 1,
        ..McpServerSpec::sse(&server.url)
    };
    let session = McpSession::start(&spec).await.expect("session");

    let err = session
        .call_tool("get_weather", json!({"city": "Tokyo"}))
        .await
        .expect_err("no answer");
    assert!(matches!(err, McpError::Timeout(_)));
    assert_eq!(err.to_string(), "Timed out waiting for tools/call get_weather");
    session.stop().await;
}

#[tokio::test]
async fn test_missing_endpoint_event_is_connection_failure() {
    let server = SseServer::start(Behavior {
        no_endpoint: true,
        ..Behavior::default()
    })
    .await;
    let spec = McpServerSpec {
        http_timeout_secs: 1,
        ..McpServerSpec::sse(&server.url)
    };
    let err = McpSession::start(&spec).await.err().expect("start must fail");
    assert_eq!(err.kind(), ErrorKind::Connection);
}
