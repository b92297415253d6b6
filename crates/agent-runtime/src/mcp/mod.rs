//! MCP client: JSON-RPC transports and the session connector the registry
//! uses to reach tool servers.

pub mod event;
pub mod http;
pub mod jsonrpc;
pub mod session;
pub mod sse;
pub mod transport;

use agent_core::{Result, ServerConfig, SessionConnector, ToolSession, TransportKind};
use async_trait::async_trait;

pub use http::HttpTransport;
pub use jsonrpc::{PROTOCOL_VERSION, RpcError};
pub use session::McpSession;
pub use sse::SseTransport;
pub use transport::RpcTransport;

/// Opens MCP sessions over the transport each server config names
#[derive(Clone, Copy, Debug, Default)]
pub struct McpConnector;

impl McpConnector {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionConnector for McpConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn ToolSession>> {
        tracing::debug!(
            target: "mcp_client",
            server = %server.name,
            url = %server.url,
            transport = %server.transport,
            "Opening MCP session"
        );

        let session: Box<dyn ToolSession> = match server.transport {
            TransportKind::Http => Box::new(McpSession::new(&server.name, HttpTransport::new(server)?)),
            TransportKind::Sse => Box::new(McpSession::new(&server.name, SseTransport::connect(server).await?)),
        };
        Ok(session)
    }
}
