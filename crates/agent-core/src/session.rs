//! Tool-Server Sessions
//!
//! Capability interface the registry uses to talk to tool servers. The core
//! never sees wire formats; `agent-runtime` provides MCP implementations and
//! tests plug in in-memory ones.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::tool::{ToolDescriptor, ToolResult};

/// Live session with one tool server
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Protocol handshake; must succeed before any other call
    async fn initialize(&self) -> Result<()>;

    /// Tools advertised by the server, in the server's own order
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool on the server
    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult>;

    /// Release transport resources. Calling it more than once is harmless.
    async fn close(&self) -> Result<()>;
}

/// Opens transport-level sessions from configuration entries
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn ToolSession>>;
}
