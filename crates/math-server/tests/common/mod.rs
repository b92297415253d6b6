//! Shared integration-test helpers: a live server and a scripted backend.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use agent_core::{
    AgentError, BackendAdapter, ReActStep, Result, ServerConfig, ToolCallInfo, ToolDescriptor, ToolResult,
    TransportKind,
};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Serve the math tools on an ephemeral port, returning the base URL
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, math_server::router()).await.unwrap() });
    format!("http://{addr}")
}

pub fn http_config(base: &str) -> ServerConfig {
    ServerConfig::new("math_server", format!("{base}/mcp")).with_transport(TransportKind::Http)
}

pub fn sse_config(base: &str) -> ServerConfig {
    ServerConfig::new("math_server", format!("{base}/sse")).with_transport(TransportKind::Sse)
}

pub fn args(a: i64, b: i64) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("a".into(), a.into());
    map.insert("b".into(), b.into());
    map
}

/// One planned model turn
pub enum Step {
    Call(&'static str, Map<String, Value>),
    /// Answer quoting the latest observation
    Conclude,
}

#[derive(Debug)]
pub enum Reply {
    Call(ToolCallInfo),
    Answer(String),
}

/// Backend that follows a fixed plan and keeps a plain-text transcript
pub struct PlannedAdapter {
    plan: Mutex<VecDeque<Step>>,
    pub sends: Mutex<usize>,
}

impl PlannedAdapter {
    pub fn new(plan: Vec<Step>) -> Self {
        Self {
            plan: Mutex::new(plan.into()),
            sends: Mutex::new(0),
        }
    }
}

#[async_trait]
impl BackendAdapter for PlannedAdapter {
    type Tool = String;
    type State = Vec<String>;
    type Response = Reply;

    fn name(&self) -> &str {
        "planned"
    }

    fn default_model(&self) -> &str {
        "planned-model"
    }

    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<String> {
        descriptors.iter().map(|d| d.name.clone()).collect()
    }

    fn create_initial_state(&self, user_input: &str) -> Vec<String> {
        vec![user_input.to_string()]
    }

    async fn send(&self, _model: &str, state: &mut Vec<String>, tools: &[String]) -> Result<Reply> {
        *self.sends.lock().unwrap() += 1;
        let step = self
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Provider("plan exhausted".into()))?;

        Ok(match step {
            Step::Call(name, arguments) => {
                if !tools.iter().any(|t| t == name) {
                    tracing::debug!(tool = name, "Planned call names a tool that was not offered");
                }
                Reply::Call(ToolCallInfo::new(name, arguments))
            }
            Step::Conclude => Reply::Answer(format!(
                "The result is {}",
                state.last().cloned().unwrap_or_default()
            )),
        })
    }

    fn parse(&self, response: &Reply) -> Result<ReActStep> {
        Ok(match response {
            Reply::Call(call) => ReActStep::action(Some(format!("Use {}", call.name)), call.clone()),
            Reply::Answer(text) => ReActStep::answer(Some(text.clone())),
        })
    }

    fn append_assistant_turn(&self, _state: &mut Vec<String>, _response: &Reply) {}

    fn append_tool_result(&self, state: &mut Vec<String>, _call: &ToolCallInfo, result: &ToolResult) {
        state.push(result.text_content());
    }

    fn extract_final_text(&self, response: &Reply) -> Result<String> {
        match response {
            Reply::Answer(text) => Ok(text.clone()),
            Reply::Call(_) => Err(AgentError::MalformedResponse("not an answer".into())),
        }
    }
}
