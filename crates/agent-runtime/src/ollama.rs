//! Ollama Backend Adapter
//!
//! Local inference through Ollama's `/api/chat` endpoint with native tool
//! calling. The conversation is an explicit message list.

use std::time::Duration;

use agent_core::{
    AgentError, BackendAdapter, ReActStep, Result, ToolCallInfo, ToolDescriptor, ToolResult,
    REACT_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api;

pub const DEFAULT_MODEL: &str = "llama3.2";

/// Ollama provider configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            port: lookup("OLLAMA_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            timeout_secs: lookup("OLLAMA_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }
}

/// Ollama chat adapter
pub struct OllamaAdapter {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaAdapter {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    /// Unlike OpenAI, arguments arrive as a JSON object
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OllamaToolFunction,
}

#[derive(Clone, Debug, Serialize)]
pub struct OllamaToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [OllamaTool]>,
    stream: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

fn arguments_object(call: &OllamaFunctionCall) -> Result<Map<String, Value>> {
    match &call.arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        // Some models still emit the OpenAI-style encoded string
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(AgentError::MalformedResponse(format!(
                "arguments for {} are not an object: {raw}",
                call.name
            ))),
        },
        other => Err(AgentError::MalformedResponse(format!(
            "arguments for {} are not an object: {other}",
            call.name
        ))),
    }
}

#[async_trait]
impl BackendAdapter for OllamaAdapter {
    type Tool = OllamaTool;
    type State = Vec<ChatMessage>;
    type Response = ChatResponse;

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<OllamaTool> {
        descriptors
            .iter()
            .map(|d| OllamaTool {
                kind: "function",
                function: OllamaToolFunction {
                    name: d.name.clone(),
                    description: d.description.clone(),
                    parameters: d.input_schema.clone(),
                },
            })
            .collect()
    }

    fn create_initial_state(&self, user_input: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new("system", REACT_SYSTEM_PROMPT),
            ChatMessage::new("user", user_input),
        ]
    }

    async fn send(&self, model: &str, state: &mut Vec<ChatMessage>, tools: &[OllamaTool]) -> Result<ChatResponse> {
        let body = ChatRequest {
            model,
            messages: state.as_slice(),
            tools: (!tools.is_empty()).then_some(tools),
            stream: false,
        };
        let request = self
            .client
            .post(format!("{}/api/chat", self.config.base_url()))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&body);

        tracing::debug!(provider = "ollama", model, messages = state.len(), "Sending chat request");
        api::send_json("ollama", request).await
    }

    fn parse(&self, response: &ChatResponse) -> Result<ReActStep> {
        let message = &response.message;
        let thought = Some(message.content.clone()).filter(|c| !c.trim().is_empty());

        let Some(call) = message.tool_calls.first() else {
            return Ok(ReActStep::answer(thought));
        };
        if message.tool_calls.len() > 1 {
            tracing::warn!(
                provider = "ollama",
                ignored = message.tool_calls.len() - 1,
                "Model requested several tools; honouring only the first"
            );
        }

        let arguments = arguments_object(&call.function)?;
        Ok(ReActStep::action(thought, ToolCallInfo::new(&call.function.name, arguments)))
    }

    fn append_assistant_turn(&self, state: &mut Vec<ChatMessage>, response: &ChatResponse) {
        let message = &response.message;
        state.push(ChatMessage {
            role: "assistant".into(),
            content: message.content.clone(),
            tool_calls: message.tool_calls.iter().take(1).cloned().collect(),
            tool_name: None,
        });
    }

    fn append_tool_result(&self, state: &mut Vec<ChatMessage>, call: &ToolCallInfo, result: &ToolResult) {
        state.push(ChatMessage {
            role: "tool".into(),
            content: result.text_content(),
            tool_calls: Vec::new(),
            tool_name: Some(call.name.clone()),
        });
    }

    fn extract_final_text(&self, response: &ChatResponse) -> Result<String> {
        Ok(response.message.content.clone())
    }
}
