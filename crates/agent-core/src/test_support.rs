//! Shared test doubles: in-memory tool servers and a scripted backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::error::{AgentError, Result};
use crate::provider::{BackendAdapter, REACT_SYSTEM_PROMPT};
use crate::session::{SessionConnector, ToolSession};
use crate::tool::{ReActStep, ToolCallInfo, ToolDescriptor, ToolResult};

pub type ToolHandler = Arc<dyn Fn(&str, &Map<String, Value>) -> Result<ToolResult> + Send + Sync>;

/// Blueprint for an in-memory tool server
#[derive(Clone)]
pub struct MockServer {
    name: String,
    tools: Vec<String>,
    fail_initialize: bool,
    fail_calls: bool,
    handler: Option<ToolHandler>,
}

impl MockServer {
    pub fn new(name: &str, tools: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tools: tools.iter().map(|t| (*t).to_string()).collect(),
            fail_initialize: false,
            fail_calls: false,
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub const fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    pub fn with_handler(mut self, handler: ToolHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// Counters shared between a connector and the sessions it opened
#[derive(Default)]
pub struct MockStats {
    connects: AtomicUsize,
    closes: AtomicUsize,
    list_calls: AtomicUsize,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct MockConnector {
    servers: HashMap<String, (MockServer, Arc<MockStats>)>,
    close_order: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new(servers: Vec<MockServer>) -> Self {
        Self {
            servers: servers
                .into_iter()
                .map(|s| (s.name.clone(), (s, Arc::new(MockStats::default()))))
                .collect(),
            close_order: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stats(&self, name: &str) -> Arc<MockStats> {
        self.servers[name].1.clone()
    }

    pub fn close_order(&self) -> Vec<String> {
        self.close_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn ToolSession>> {
        let (blueprint, stats) = self
            .servers
            .get(&server.name)
            .ok_or_else(|| AgentError::connection(&server.name, "connection refused"))?;
        stats.connects.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            blueprint: blueprint.clone(),
            stats: stats.clone(),
            close_order: self.close_order.clone(),
        }))
    }
}

struct MockSession {
    blueprint: MockServer,
    stats: Arc<MockStats>,
    close_order: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ToolSession for MockSession {
    async fn initialize(&self) -> Result<()> {
        if self.blueprint.fail_initialize {
            return Err(AgentError::Transport("handshake rejected".into()));
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.stats.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .blueprint
            .tools
            .iter()
            .map(|name| ToolDescriptor::new(name, format!("{name} tool"), serde_json::json!({ "type": "object" })))
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        self.stats
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));

        if self.blueprint.fail_calls {
            return Err(AgentError::Transport("server went away".into()));
        }
        match &self.blueprint.handler {
            Some(handler) => handler(name, arguments),
            None => Ok(ToolResult::text(format!("{}:{name}", self.blueprint.name))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.close_order
            .lock()
            .unwrap()
            .push(self.blueprint.name.clone());
        Ok(())
    }
}

/// One scripted model turn
#[derive(Clone, Debug)]
pub enum Turn {
    Tool {
        thought: Option<String>,
        name: String,
        arguments: Map<String, Value>,
    },
    Answer(String),
    Garbage,
}

impl Turn {
    pub fn tool(name: &str, arguments: Value) -> Self {
        Self::Tool {
            thought: Some(format!("I should call {name}")),
            name: name.to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }

    pub fn answer(text: &str) -> Self {
        Self::Answer(text.to_string())
    }
}

/// Backend that replays a fixed script and records what it was sent
#[derive(Default)]
pub struct ScriptedAdapter {
    turns: Mutex<VecDeque<Turn>>,
    sends: AtomicUsize,
    models: Mutex<Vec<String>>,
    transcripts: Mutex<Vec<Vec<String>>>,
    tools_seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedAdapter {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Self::default()
        }
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    /// Conversation state as seen by each `send`
    pub fn transcripts(&self) -> Vec<Vec<String>> {
        self.transcripts.lock().unwrap().clone()
    }

    pub fn tools_seen(&self) -> Vec<Vec<String>> {
        self.tools_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendAdapter for ScriptedAdapter {
    type Tool = String;
    type State = Vec<String>;
    type Response = Turn;

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-default"
    }

    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<String> {
        descriptors.iter().map(|d| d.name.clone()).collect()
    }

    fn create_initial_state(&self, user_input: &str) -> Vec<String> {
        vec![
            format!("system: {}", REACT_SYSTEM_PROMPT.lines().next().unwrap_or_default()),
            format!("user: {user_input}"),
        ]
    }

    async fn send(&self, model: &str, state: &mut Vec<String>, tools: &[String]) -> Result<Turn> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        self.transcripts.lock().unwrap().push(state.clone());
        self.tools_seen.lock().unwrap().push(tools.to_vec());

        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".into()))
    }

    fn parse(&self, response: &Turn) -> Result<ReActStep> {
        match response {
            Turn::Tool {
                thought,
                name,
                arguments,
            } => Ok(ReActStep::action(
                thought.clone(),
                ToolCallInfo::new(name, arguments.clone()),
            )),
            Turn::Answer(text) => Ok(ReActStep::answer(Some(text.clone()))),
            Turn::Garbage => Err(AgentError::MalformedResponse("unreadable turn".into())),
        }
    }

    fn append_assistant_turn(&self, state: &mut Vec<String>, response: &Turn) {
        if let Turn::Tool { name, .. } = response {
            state.push(format!("assistant: call {name}"));
        }
    }

    fn append_tool_result(&self, state: &mut Vec<String>, call: &ToolCallInfo, result: &ToolResult) {
        state.push(format!("tool {}: {}", call.name, result.text_content()));
    }

    fn extract_final_text(&self, response: &Turn) -> Result<String> {
        match response {
            Turn::Answer(text) => Ok(text.clone()),
            _ => Err(AgentError::MalformedResponse("no final text".into())),
        }
    }
}
