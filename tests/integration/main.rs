//! Integration tests against in-process mock servers: mockito for the
//! Messages API and Streamable HTTP MCP, a small TCP server for legacy SSE.

mod end_to_end;
mod mock_server;
mod sse_transport;
