//! Server Registry
//!
//! Holds one live session per named tool server plus the aggregated routing
//! table. Connections are kept in acquisition order so that tool listings are
//! deterministic and cleanup can release them in reverse.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::audit;
use crate::config::{McpConfig, ServerConfig, TransportKind};
use crate::error::{AgentError, Result};
use crate::router::{RoutingTable, ToolRouter};
use crate::session::{SessionConnector, ToolSession};
use crate::tool::ToolDescriptor;

/// A registered tool server
pub struct ServerConnection {
    pub name: String,
    pub url: String,
    pub transport: TransportKind,
    pub headers: HashMap<String, String>,
    pub session: Box<dyn ToolSession>,
}

impl std::fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConnection")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Registry of connected tool servers
pub struct ServerRegistry {
    connector: Arc<dyn SessionConnector>,
    connections: Vec<ServerConnection>,
    routes: RoutingTable,
}

impl ServerRegistry {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            connections: Vec::new(),
            routes: RoutingTable::new(),
        }
    }

    /// Connect to a server, handshake, and route its tools to it.
    ///
    /// Re-registering a name closes the previous session first and drops
    /// its routes. A tool already owned by another server is taken over by
    /// this one.
    pub async fn add_server(&mut self, server: &ServerConfig) -> Result<()> {
        let operation = format!("add_server({})", server.name);
        audit::timed(&operation, self.add_server_inner(server)).await
    }

    async fn add_server_inner(&mut self, server: &ServerConfig) -> Result<()> {
        let session = self
            .connector
            .connect(server)
            .await
            .map_err(|e| into_connection_error(&server.name, e))?;

        let tools = match handshake(session.as_ref()).await {
            Ok(tools) => tools,
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    tracing::warn!(
                        target: "mcp_client",
                        server = %server.name,
                        error = %close_err,
                        "Failed to close session after handshake failure"
                    );
                }
                return Err(into_connection_error(&server.name, e));
            }
        };

        if let Some(pos) = self.connections.iter().position(|c| c.name == server.name) {
            let previous = self.connections.remove(pos);
            tracing::warn!(
                target: "mcp_client",
                "Server '{}' was already registered; replacing previous connection to {}",
                previous.name,
                previous.url
            );
            self.routes.remove_server(&previous.name);
            release(&previous).await;
        }

        for tool in &tools {
            if let Some(owner) = self.routes.insert(tool.name.clone(), server.name.clone()) {
                if owner != server.name {
                    tracing::warn!(
                        target: "mcp_client",
                        "Tool '{}' from '{}' shadows the one from '{}'",
                        tool.name,
                        server.name,
                        owner
                    );
                }
            }
        }

        self.connections.push(ServerConnection {
            name: server.name.clone(),
            url: server.url.clone(),
            transport: server.transport,
            headers: server.headers.clone(),
            session,
        });

        tracing::info!(
            target: "mcp_client",
            "Added MCP server '{}' from {} (transport: {}, tools: {})",
            server.name,
            server.url,
            server.transport,
            tools.len()
        );
        Ok(())
    }

    /// Register every configured server in order, stopping at the first
    /// failure. Servers registered before the failure stay registered.
    pub async fn load_from_config(&mut self, config: &McpConfig) -> Result<()> {
        tracing::info!(target: "mcp_client", "Loading {} server(s) from config...", config.len());

        for server in &config.servers {
            self.add_server(server).await?;
        }

        tracing::info!(
            target: "mcp_client",
            "Successfully loaded {} server(s). Total tools: {}",
            config.len(),
            self.routes.len()
        );
        Ok(())
    }

    /// Fresh tool listing from every server, in registration order
    pub async fn list_all_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let listings = try_join_all(self.connections.iter().map(|c| async move {
            c.session.list_tools().await.map_err(|e| match e {
                e @ AgentError::Transport(_) => e,
                other => AgentError::Transport(format!("{}: {other}", c.name)),
            })
        }))
        .await?;

        Ok(listings.into_iter().flatten().collect())
    }

    /// Close every session, most recently acquired first. Safe to call
    /// repeatedly.
    pub async fn cleanup(&mut self) {
        while let Some(connection) = self.connections.pop() {
            release(&connection).await;
        }
        self.routes = RoutingTable::new();
    }

    pub fn router(&self) -> ToolRouter<'_> {
        ToolRouter::new(self.connections.as_slice(), &self.routes)
    }

    pub const fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn connections(&self) -> &[ServerConnection] {
        &self.connections
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Drop for ServerRegistry {
    fn drop(&mut self) {
        if !self.connections.is_empty() {
            tracing::warn!(
                target: "mcp_client",
                "Registry dropped with {} open connection(s); call cleanup() to close them gracefully",
                self.connections.len()
            );
            self.connections.clear();
        }
    }
}

async fn handshake(session: &dyn ToolSession) -> Result<Vec<ToolDescriptor>> {
    session.initialize().await?;
    session.list_tools().await
}

async fn release(connection: &ServerConnection) {
    match connection.session.close().await {
        Ok(()) => tracing::debug!(target: "mcp_client", server = %connection.name, "Closed session"),
        Err(e) => tracing::warn!(
            target: "mcp_client",
            server = %connection.name,
            error = %e,
            "Failed to close session"
        ),
    }
}

fn into_connection_error(server: &str, err: AgentError) -> AgentError {
    match err {
        e @ AgentError::Connection { .. } => e,
        other => AgentError::connection(server, other),
    }
}
