//! MCP client session on top of any [`RpcTransport`].

use agent_core::{AgentError, Result, ToolDescriptor, ToolResult, ToolSession};
use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::jsonrpc::{PROTOCOL_VERSION, RpcError};
use super::transport::RpcTransport;

pub struct McpSession<T: RpcTransport> {
    server: String,
    transport: T,
}

impl<T: RpcTransport> McpSession<T> {
    pub fn new(server: impl Into<String>, transport: T) -> Self {
        Self {
            server: server.into(),
            transport,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

fn decode_tools(result: &Value) -> Result<(Vec<ToolDescriptor>, Option<String>)> {
    let tools = result
        .get("tools")
        .cloned()
        .ok_or_else(|| AgentError::Transport("tools/list: missing tools array".into()))?;
    let tools: Vec<ToolDescriptor> = serde_json::from_value(tools)
        .map_err(|e| AgentError::Transport(format!("tools/list: {e}")))?;
    let cursor = result
        .get("nextCursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_owned);
    Ok((tools, cursor))
}

fn decode_call_result(result: Value) -> ToolResult {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let content = match result {
        Value::Object(mut obj) => obj.remove("content").unwrap_or_else(|| json!([])),
        other => other,
    };
    ToolResult::new(content).with_error_flag(is_error)
}

#[async_trait]
impl<T: RpcTransport> ToolSession for McpSession<T> {
    async fn initialize(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "mcp-react",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self.transport.request("initialize", params).await?;

        tracing::info!(
            target: "mcp_client",
            server = %self.server,
            protocol = result.get("protocolVersion").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            "Server initialized"
        );

        self.transport
            .notify("notifications/initialized", json!({}))
            .await?;
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let params = cursor
                .as_ref()
                .map_or_else(|| json!({}), |c| json!({ "cursor": c }));
            let result = self.transport.request("tools/list", params).await?;
            let (page, next) = decode_tools(&result)?;
            tools.extend(page);

            match next {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    tracing::warn!(
                        target: "mcp_client",
                        server = %self.server,
                        cursor = %next,
                        "tools/list repeated a cursor; stopping pagination"
                    );
                    break;
                }
                None => break,
            }
        }
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        let params = json!({ "name": name, "arguments": arguments });
        match self.transport.request("tools/call", params).await {
            Ok(result) => Ok(decode_call_result(result)),
            Err(RpcError::Remote { code, message }) => Err(AgentError::tool_execution(
                name,
                format!("{message} (code {code})"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self) -> Result<()> {
        tracing::debug!(target: "mcp_client", server = %self.server, "Closing session");
        self.transport.close().await?;
        Ok(())
    }
}
