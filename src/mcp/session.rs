//! MCP session lifecycle
//!
//! A session is one connected, initialized MCP server with its tool catalog
//! fetched. Start-up is all-or-nothing: if any phase fails, the connection is
//! released and the error is classified by phase.
//!
//! Framing, the handshake and both HTTP transports come from `rmcp`; this
//! module adds timeouts, the protocol version check, catalog pagination and
//! error classification.

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation, PaginatedRequestParam, ProtocolVersion,
    ServerInfo,
};
use rmcp::service::RunningService;
use rmcp::transport::{IntoTransport, SseClientTransport, StreamableHttpClientTransport};
use rmcp::{Peer, RoleClient, ServiceExt};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::error::McpError;
use super::{McpServerSpec, McpTool, McpToolResult, McpTransportKind, ToolSession, SUPPORTED_PROTOCOL_VERSIONS};
use crate::{Error, Result};

type ClientService = RunningService<RoleClient, ClientInfo>;

/// A started MCP session.
///
/// Dropping a session without calling [`McpSession::stop`] cancels the
/// service task; the connection (and, over Streamable HTTP, the logical
/// session) is then released in the background.
pub struct McpSession {
    service: ClientService,
    server: ServerInfo,
    protocol_version: String,
    catalog: Vec<McpTool>,
    request_timeout: Duration,
}

impl McpSession {
    /// Connect to `spec`, perform the handshake and fetch the tool catalog.
    pub async fn start(spec: &McpServerSpec) -> Result<Self> {
        debug!(server = %spec.name, url = %spec.url, transport = ?spec.transport, "starting MCP session");
        match spec.transport {
            McpTransportKind::Sse => {
                let connect_timeout = Duration::from_secs(spec.http_timeout_secs);
                let transport = match timeout(connect_timeout, SseClientTransport::start(spec.url.as_str())).await {
                    Ok(Ok(transport)) => transport,
                    Ok(Err(e)) => return Err(Error::connection(McpError::ConnectionError(e.to_string()))),
                    Err(_) => {
                        return Err(Error::connection(McpError::Timeout(format!(
                            "endpoint event from {}",
                            spec.url
                        ))))
                    }
                };
                Self::start_with_transport(transport, spec).await
            }
            McpTransportKind::StreamableHttp => {
                let transport = StreamableHttpClientTransport::from_uri(spec.url.as_str());
                Self::start_with_transport(transport, spec).await
            }
        }
    }

    /// Handshake and catalog discovery over an already-open transport.
    pub async fn start_with_transport<T, E, A>(transport: T, spec: &McpServerSpec) -> Result<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        // rmcp waits indefinitely when `initialize` is answered with an error
        let handshake_timeout = Duration::from_secs(spec.http_timeout_secs);
        let service = match timeout(handshake_timeout, client_info().serve(transport)).await {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => {
                let e = McpError::from(e);
                return Err(if e.is_connection_failure() {
                    Error::connection(e)
                } else {
                    Error::handshake(e)
                });
            }
            Err(_) => return Err(Error::handshake(McpError::Timeout("initialize response".into()))),
        };

        let server = match service.peer_info() {
            Some(info) => info.clone(),
            None => {
                release(service).await;
                return Err(Error::handshake(McpError::Protocol(
                    "no initialize result recorded".into(),
                )));
            }
        };
        let protocol_version = server.protocol_version.to_string();
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&protocol_version.as_str()) {
            release(service).await;
            return Err(Error::handshake(McpError::Protocol(format!(
                "unsupported protocol version {}",
                protocol_version
            ))));
        }
        info!(
            server = %server.server_info.name,
            version = %server.server_info.version,
            protocol = %protocol_version,
            "MCP session initialized"
        );

        let request_timeout = Duration::from_secs(spec.sse_read_timeout_secs);
        let catalog = match timeout(request_timeout, list_catalog(service.peer())).await {
            Ok(Ok(tools)) => tools,
            Ok(Err(e)) => {
                release(service).await;
                return Err(Error::catalog(e));
            }
            Err(_) => {
                release(service).await;
                return Err(Error::catalog(McpError::Timeout("tools/list".into())));
            }
        };

        info!(
            server = %server.server_info.name,
            tools = ?catalog.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "connected to MCP server"
        );

        Ok(Self {
            service,
            server,
            protocol_version,
            catalog,
            request_timeout,
        })
    }

    pub fn catalog(&self) -> &[McpTool] {
        &self.catalog
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server.server_info
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Usage hints the server sent during the handshake.
    pub fn instructions(&self) -> Option<&str> {
        self.server.instructions.as_deref()
    }

    /// Cancel the service and wait for it to release the connection.
    /// Failures are logged, never returned.
    pub async fn stop(self) {
        let name = self.server.server_info.name;
        release(self.service).await;
        debug!(server = %name, "MCP session stopped");
    }
}

/// Announced as `clientInfo` in `initialize`.
fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::V_2024_11_05,
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
    }
}

/// Fetch the full tool catalog, following `nextCursor` until it is absent or
/// repeats.
async fn list_catalog(peer: &Peer<RoleClient>) -> std::result::Result<Vec<McpTool>, McpError> {
    let mut tools = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = None;

    loop {
        let page = peer.list_tools(Some(PaginatedRequestParam { cursor: cursor.take() })).await?;
        tools.extend(page.tools.into_iter().map(McpTool::from));

        match page.next_cursor {
            Some(next) if seen.insert(next.clone()) => cursor = Some(next),
            Some(repeated) => {
                debug!(cursor = %repeated, "cursor repeated; stopping pagination");
                break;
            }
            None => break,
        }
    }
    debug!(count = tools.len(), "tool catalog fetched");
    Ok(tools)
}

async fn release(service: ClientService) {
    if let Err(e) = service.cancel().await {
        warn!(error = %e, "MCP service task ended abnormally");
    }
}

#[async_trait]
impl ToolSession for McpSession {
    fn catalog(&self) -> &[McpTool] {
        &self.catalog
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> std::result::Result<McpToolResult, McpError> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(McpError::InvalidArguments(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };
        let request = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        };
        let result = timeout(self.request_timeout, self.service.peer().call_tool(request))
            .await
            .map_err(|_| McpError::Timeout(format!("tools/call {}", name)))??;
        Ok(McpToolResult::try_from(result)?)
    }
}
