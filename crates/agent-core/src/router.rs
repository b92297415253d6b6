//! Tool Routing
//!
//! The routing table is the single source of truth for which server handles
//! a tool; the loop never addresses a server directly.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::audit::{self, AuditSink};
use crate::error::{AgentError, Result};
use crate::registry::ServerConnection;
use crate::tool::ToolResult;

/// Tool name -> owning server name
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    entries: HashMap<String, String>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `tool` at `server`, returning the previous owner if any
    pub fn insert(&mut self, tool: impl Into<String>, server: impl Into<String>) -> Option<String> {
        self.entries.insert(tool.into(), server.into())
    }

    pub fn get(&self, tool: &str) -> Option<&str> {
        self.entries.get(tool).map(String::as_str)
    }

    /// Drop every entry owned by `server`
    pub fn remove_server(&mut self, server: &str) {
        self.entries.retain(|_, owner| owner != server);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves tool names and forwards calls to the owning connection
#[derive(Clone, Copy)]
pub struct ToolRouter<'a> {
    connections: &'a [ServerConnection],
    routes: &'a RoutingTable,
}

impl<'a> ToolRouter<'a> {
    pub(crate) const fn new(connections: &'a [ServerConnection], routes: &'a RoutingTable) -> Self {
        Self {
            connections,
            routes,
        }
    }

    /// Server that owns `tool`
    pub fn resolve(&self, tool: &str) -> Result<&'a str> {
        self.routes
            .get(tool)
            .ok_or_else(|| AgentError::ToolNotFound(tool.to_string()))
    }

    /// Forward a call to the owning server
    pub async fn dispatch(&self, tool: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        let server = self.resolve(tool)?;
        let connection = self
            .connections
            .iter()
            .find(|c| c.name == server)
            .ok_or_else(|| AgentError::ToolNotFound(tool.to_string()))?;

        tracing::debug!(target: "mcp_client", tool, server, "Dispatching tool call");

        connection
            .session
            .call_tool(tool, arguments)
            .await
            .map_err(|e| match e {
                e @ AgentError::ToolExecution { .. } => e,
                other => AgentError::tool_execution(tool, other),
            })
    }

    /// `dispatch`, recorded under call number `index`
    pub async fn dispatch_with_audit(
        &self,
        index: usize,
        tool: &str,
        arguments: &Map<String, Value>,
        sink: &dyn AuditSink,
    ) -> Result<ToolResult> {
        audit::audited(index, tool, arguments, sink, self.dispatch(tool, arguments)).await
    }
}
