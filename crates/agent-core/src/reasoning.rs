//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern on top of any
//! [`BackendAdapter`]. Each turn the model either answers or names one tool;
//! the tool runs on its owning server and the observation is folded back in
//! before the next turn is requested.

use std::sync::Arc;

use crate::audit::{self, AuditSink, TracingAudit};
use crate::config::{McpConfig, ServerConfig};
use crate::error::{AgentError, Result};
use crate::provider::BackendAdapter;
use crate::registry::ServerRegistry;
use crate::session::SessionConnector;
use crate::tool::ToolDescriptor;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum tool calls per `chat`; `None` lets the model run unbounded
    pub max_iterations: Option<usize>,

    /// Model override applied when `chat` is not given one
    pub default_model: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(10),
            default_model: None,
        }
    }
}

/// Tool-calling client: server registry plus one backend adapter
pub struct McpAgent<A: BackendAdapter> {
    adapter: A,
    registry: ServerRegistry,
    config: AgentConfig,
    audit: Arc<dyn AuditSink>,
}

impl<A: BackendAdapter> McpAgent<A> {
    /// Create a new agent
    pub fn new(adapter: A, connector: Arc<dyn SessionConnector>, config: AgentConfig) -> Self {
        Self {
            adapter,
            registry: ServerRegistry::new(connector),
            config,
            audit: Arc::new(TracingAudit),
        }
    }

    pub async fn add_server(&mut self, server: &ServerConfig) -> Result<()> {
        self.registry.add_server(server).await
    }

    pub async fn load_from_config(&mut self, config: &McpConfig) -> Result<()> {
        self.registry.load_from_config(config).await
    }

    pub async fn list_all_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.registry.list_all_tools().await
    }

    /// Run the ReAct loop on `user_input` until the model stops calling tools
    pub async fn chat(&mut self, user_input: &str, model: Option<&str>) -> Result<String> {
        let model = model
            .map(str::to_owned)
            .or_else(|| self.config.default_model.clone())
            .unwrap_or_else(|| self.adapter.default_model().to_owned());

        audit::timed("chat", self.run(user_input, &model)).await
    }

    async fn run(&self, user_input: &str, model: &str) -> Result<String> {
        let descriptors = self.registry.list_all_tools().await?;
        let tools = self.adapter.convert_tools(&descriptors);
        let mut state = self.adapter.create_initial_state(user_input);
        let router = self.registry.router();

        tracing::debug!(
            target: "mcp_client",
            provider = self.adapter.name(),
            model,
            tools = descriptors.len(),
            "Starting ReAct loop"
        );

        let mut call_count = 0;
        loop {
            let response = self.adapter.send(model, &mut state, &tools).await?;
            let step = self.adapter.parse(&response)?;

            let Some(call) = step.tool_call else {
                return self.adapter.extract_final_text(&response);
            };

            if let Some(max) = self.config.max_iterations {
                if call_count >= max {
                    return Err(AgentError::LoopExceeded(max));
                }
            }

            if let Some(thought) = &step.thought {
                tracing::info!(target: "mcp_client", "[Thought {}] {}", call_count + 1, thought);
            }

            self.adapter.append_assistant_turn(&mut state, &response);

            call_count += 1;
            tracing::info!(
                target: "mcp_client",
                "[Action {}] {}({})",
                call_count,
                call.name,
                serde_json::Value::Object(call.arguments.clone())
            );

            let result = router
                .dispatch_with_audit(call_count, &call.name, &call.arguments, self.audit.as_ref())
                .await?;
            tracing::info!(target: "mcp_client", "[Observation {}] {}", call_count, result.summary());

            self.adapter.append_tool_result(&mut state, &call, &result);
        }
    }

    /// Close every server connection; safe to call more than once
    pub async fn cleanup(&mut self) {
        self.registry.cleanup().await;
    }

    pub const fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for [`McpAgent`]
pub struct AgentBuilder<A: BackendAdapter> {
    adapter: A,
    connector: Option<Arc<dyn SessionConnector>>,
    audit: Option<Arc<dyn AuditSink>>,
    config: AgentConfig,
}

impl<A: BackendAdapter> AgentBuilder<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            connector: None,
            audit: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn SessionConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = Some(max);
        self
    }

    /// Remove the tool-call cap
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.config.max_iterations = None;
        self
    }

    pub fn build(self) -> Result<McpAgent<A>> {
        let connector = self
            .connector
            .ok_or_else(|| AgentError::Config("Session connector is required".into()))?;

        let mut agent = McpAgent::new(self.adapter, connector, self.config);
        if let Some(sink) = self.audit {
            agent.audit = sink;
        }
        Ok(agent)
    }
}
