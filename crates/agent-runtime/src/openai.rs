//! OpenAI Backend Adapter
//!
//! Chat Completions with function tools. The conversation is an explicit
//! message list that the loop threads between calls.

use agent_core::{
    AgentError, BackendAdapter, ReActStep, Result, ToolCallInfo, ToolDescriptor, ToolResult,
    REACT_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI chat-completions adapter
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Point at an OpenAI-compatible endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiFunction {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ApiToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ApiToolFunction,
}

#[derive(Clone, Debug, Serialize)]
pub struct ApiToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ApiToolDefinition]>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

impl ChatCompletion {
    fn message(&self) -> Result<&ChatMessage> {
        self.choices
            .first()
            .map(|c| &c.message)
            .ok_or_else(|| AgentError::MalformedResponse("completion has no choices".into()))
    }
}

fn decode_arguments(call: &ApiToolCall) -> Result<serde_json::Map<String, Value>> {
    let raw = if call.function.arguments.trim().is_empty() {
        "{}"
    } else {
        call.function.arguments.as_str()
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AgentError::MalformedResponse(format!(
            "arguments for {} are not an object: {other}",
            call.function.name
        ))),
        Err(e) => Err(AgentError::MalformedResponse(format!(
            "arguments for {} are not valid JSON: {e}",
            call.function.name
        ))),
    }
}

#[async_trait]
impl BackendAdapter for OpenAiAdapter {
    type Tool = ApiToolDefinition;
    type State = Vec<ChatMessage>;
    type Response = ChatCompletion;

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<ApiToolDefinition> {
        descriptors
            .iter()
            .map(|d| ApiToolDefinition {
                kind: "function",
                function: ApiToolFunction {
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

    async fn send(
        &self,
        model: &str,
        state: &mut Vec<ChatMessage>,
        tools: &[ApiToolDefinition],
    ) -> Result<ChatCompletion> {
        let body = CompletionRequest {
            model,
            messages: state.as_slice(),
            tools: (!tools.is_empty()).then_some(tools),
        };
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        tracing::debug!(provider = "openai", model, messages = state.len(), "Sending completion request");
        api::send_json("openai", request).await
    }

    fn parse(&self, response: &ChatCompletion) -> Result<ReActStep> {
        let message = response.message()?;
        let thought = message.content.clone().filter(|c| !c.trim().is_empty());

        let Some(call) = message.tool_calls.first() else {
            return Ok(ReActStep::answer(thought));
        };
        if message.tool_calls.len() > 1 {
            tracing::warn!(
                provider = "openai",
                ignored = message.tool_calls.len() - 1,
                "Model requested several tools; honouring only the first"
            );
        }

        let info = ToolCallInfo::new(&call.function.name, decode_arguments(call)?).with_call_id(&call.id);
        Ok(ReActStep::action(thought, info))
    }

    fn append_assistant_turn(&self, state: &mut Vec<ChatMessage>, response: &ChatCompletion) {
        let Ok(message) = response.message() else {
            return;
        };
        // Every echoed call needs a matching tool message, so echo only the one we run
        state.push(ChatMessage {
            role: "assistant".into(),
            content: message.content.clone(),
            tool_calls: message.tool_calls.iter().take(1).cloned().collect(),
            tool_call_id: None,
        });
    }

    fn append_tool_result(&self, state: &mut Vec<ChatMessage>, call: &ToolCallInfo, result: &ToolResult) {
        state.push(ChatMessage {
            role: "tool".into(),
            content: Some(result.text_content()),
            tool_calls: Vec::new(),
            tool_call_id: call.call_id.clone(),
        });
    }

    fn extract_final_text(&self, response: &ChatCompletion) -> Result<String> {
        Ok(response.message()?.content.clone().unwrap_or_default())
    }
}
