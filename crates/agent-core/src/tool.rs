//! Tool Types
//!
//! Provider-neutral descriptions of tools advertised by tool servers, the
//! calls a model makes against them, and the payloads servers send back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool advertised by a connected server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool identifier, unique across all connected servers
    pub name: String,

    /// Human-readable description (shown to the model)
    #[serde(default)]
    pub description: String,

    /// JSON Schema describing the arguments
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object" })
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool call request extracted from a model turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Correlation id, only for providers that pair calls and results by id
    #[serde(default)]
    pub call_id: Option<String>,
}

impl ToolCallInfo {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: None,
        }
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.call_id = Some(id.into());
        self
    }
}

/// Payload returned by a tool server.
///
/// The router never interprets it; adapters decide how to fold `content`
/// back into their conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content blocks as reported by the server
    pub content: Value,

    /// Server flagged the call as failed but still produced content
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    pub const fn new(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Single text block, the shape most servers use
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(serde_json::json!([{ "type": "text", "text": text.into() }]))
    }

    #[must_use]
    pub const fn with_error_flag(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// Concatenated text blocks, or the JSON rendering when there are none
    pub fn text_content(&self) -> String {
        let texts: Vec<&str> = match &self.content {
            Value::String(s) => return s.clone(),
            Value::Array(blocks) => blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect(),
            _ => Vec::new(),
        };

        if texts.is_empty() {
            self.content.to_string()
        } else {
            texts.join("\n")
        }
    }

    /// Short rendering for logs and audit records
    pub fn summary(&self) -> String {
        const MAX: usize = 200;
        let text = self.text_content();
        let mut summary: String = text.chars().take(MAX).collect();
        if text.chars().count() > MAX {
            summary.push_str("...");
        }
        if self.is_error {
            format!("error: {summary}")
        } else {
            summary
        }
    }
}

/// One parsed model turn
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReActStep {
    /// Free-text reasoning, if the model produced any
    pub thought: Option<String>,

    /// The single tool invocation honoured for this turn
    pub tool_call: Option<ToolCallInfo>,
}

impl ReActStep {
    pub fn answer(thought: Option<String>) -> Self {
        Self {
            thought,
            tool_call: None,
        }
    }

    pub const fn action(thought: Option<String>, call: ToolCallInfo) -> Self {
        Self {
            thought,
            tool_call: Some(call),
        }
    }

    /// A step without a tool call ends the loop
    pub const fn is_terminal(&self) -> bool {
        self.tool_call.is_none()
    }
}
