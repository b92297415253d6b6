//! Gemini Backend Adapter
//!
//! Uses `generateContent` through a stateful [`ChatSession`]: the session
//! records both the outgoing turn and the model's reply itself, so the loop
//! never echoes assistant turns.

use agent_core::{
    AgentError, BackendAdapter, ReActStep, Result, ToolCallInfo, ToolDescriptor, ToolResult,
    REACT_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::api;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    /// Fields we do not interpret (thought signatures and the like) are kept
    /// so the model's turn is echoed back verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Chat history plus the user-side parts waiting for the next `send`
#[derive(Clone, Debug, Default)]
pub struct ChatSession {
    history: Vec<Content>,
    outgoing: Vec<Part>,
}

impl ChatSession {
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn outgoing(&self) -> &[Part] {
        &self.outgoing
    }

    /// History with the outgoing turn appended, as sent on the wire
    fn contents(&self) -> Vec<Content> {
        let mut contents = self.history.clone();
        if !self.outgoing.is_empty() {
            contents.push(Content {
                role: "user".into(),
                parts: self.outgoing.clone(),
            });
        }
        contents
    }

    fn commit(&mut self, mut reply: Content) {
        keep_first_call(&mut reply);
        let parts = std::mem::take(&mut self.outgoing);
        if !parts.is_empty() {
            self.history.push(Content {
                role: "user".into(),
                parts,
            });
        }
        self.history.push(reply);
    }
}

/// Only the first `functionCall` is answered, so the recorded turn must not
/// carry the others. Signatures and other fields on the kept part survive.
fn keep_first_call(content: &mut Content) {
    let mut seen = false;
    content.parts.retain(|part| {
        if part.function_call.is_none() {
            return true;
        }
        !std::mem::replace(&mut seen, true)
    });
}

#[derive(Clone, Debug, Serialize)]
pub struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(rename = "parametersJsonSchema")]
    pub parameters_json_schema: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [GeminiTool]>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

impl GenerateResponse {
    fn content(&self) -> Result<&Content> {
        self.candidates
            .first()
            .map(|c| &c.content)
            .ok_or_else(|| AgentError::MalformedResponse("response has no candidates".into()))
    }

    fn text(&self) -> Result<Option<String>> {
        let texts: Vec<&str> = self
            .content()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Ok((!texts.is_empty()).then(|| texts.concat()))
    }
}

#[async_trait]
impl BackendAdapter for GeminiAdapter {
    type Tool = GeminiTool;
    type State = ChatSession;
    type Response = GenerateResponse;

    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<GeminiTool> {
        if descriptors.is_empty() {
            return Vec::new();
        }
        vec![GeminiTool {
            function_declarations: descriptors
                .iter()
                .map(|d| FunctionDeclaration {
                    name: d.name.clone(),
                    description: d.description.clone(),
                    parameters_json_schema: d.input_schema.clone(),
                })
                .collect(),
        }]
    }

    fn create_initial_state(&self, user_input: &str) -> ChatSession {
        ChatSession {
            history: Vec::new(),
            outgoing: vec![Part::text(user_input)],
        }
    }

    async fn send(&self, model: &str, state: &mut ChatSession, tools: &[GeminiTool]) -> Result<GenerateResponse> {
        let body = GenerateRequest {
            system_instruction: Content {
                role: String::new(),
                parts: vec![Part::text(REACT_SYSTEM_PROMPT)],
            },
            contents: state.contents(),
            tools: (!tools.is_empty()).then_some(tools),
        };
        let request = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body);

        tracing::debug!(provider = "gemini", model, turns = body.contents.len(), "Sending generateContent request");
        let response: GenerateResponse = api::send_json("gemini", request).await?;

        let mut reply = response.content()?.clone();
        if reply.role.is_empty() {
            reply.role = "model".into();
        }
        state.commit(reply);
        Ok(response)
    }

    fn parse(&self, response: &GenerateResponse) -> Result<ReActStep> {
        let content = response.content()?;
        let thought = response.text()?.filter(|t| !t.trim().is_empty());

        let mut calls = content.parts.iter().filter_map(|p| p.function_call.as_ref());
        let Some(call) = calls.next() else {
            return Ok(ReActStep::answer(thought));
        };
        let ignored = calls.count();
        if ignored > 0 {
            tracing::warn!(provider = "gemini", ignored, "Model requested several tools; honouring only the first");
        }

        Ok(ReActStep::action(thought, ToolCallInfo::new(&call.name, call.args.clone())))
    }

    fn append_assistant_turn(&self, _state: &mut ChatSession, _response: &GenerateResponse) {}

    fn append_tool_result(&self, state: &mut ChatSession, call: &ToolCallInfo, result: &ToolResult) {
        state.outgoing.push(Part {
            function_response: Some(FunctionResponse {
                name: call.name.clone(),
                response: json!({ "result": result.content }),
            }),
            ..Part::default()
        });
    }

    fn extract_final_text(&self, response: &GenerateResponse) -> Result<String> {
        Ok(response.text()?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::{Json, Router, routing::post};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn response(value: Value) -> GenerateResponse {
        serde_json::from_value(value).unwrap()
    }

    fn function_call_reply() -> Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [
            { "text": "Multiply first." },
            { "functionCall": { "name": "multiply", "args": { "a": 15, "b": 3 } }, "thoughtSignature": "sig" },
            { "functionCall": { "name": "divide", "args": { "a": 45, "b": 5 } } }
        ]}}]})
    }

    #[test]
    fn test_convert_tools_single_block() {
        let adapter = GeminiAdapter::new("key");
        let schema = json!({ "type": "object", "properties": { "a": { "type": "number" } }, "required": ["a"] });
        let tools = adapter.convert_tools(&[
            ToolDescriptor::new("add", "Add", schema.clone()),
            ToolDescriptor::new("divide", "Divide", schema.clone()),
        ]);

        assert_eq!(tools.len(), 1);
        let value = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(value["functionDeclarations"][1]["name"], "divide");
        assert_eq!(value["functionDeclarations"][0]["parametersJsonSchema"], schema);

        assert!(adapter.convert_tools(&[]).is_empty());
    }

    #[test]
    fn test_parse_first_function_call() {
        let adapter = GeminiAdapter::new("key");
        let step = adapter.parse(&response(function_call_reply())).unwrap();

        assert_eq!(step.thought.as_deref(), Some("Multiply first."));
        let call = step.tool_call.unwrap();
        assert_eq!(call.name, "multiply");
        assert_eq!(call.arguments["b"], 3);
        assert!(call.call_id.is_none());
    }

    #[test]
    fn test_parse_text_and_empty() {
        let adapter = GeminiAdapter::new("key");
        let done = response(json!({ "candidates": [{ "content": { "role": "model", "parts": [
            { "text": "The answer " }, { "text": "is 9." }
        ]}}]}));
        assert!(adapter.parse(&done).unwrap().is_terminal());
        assert_eq!(adapter.extract_final_text(&done).unwrap(), "The answer is 9.");

        let empty = response(json!({ "candidates": [] }));
        assert!(matches!(adapter.parse(&empty), Err(AgentError::MalformedResponse(_))));
    }

    #[test]
    fn test_tool_result_becomes_function_response() {
        let adapter = GeminiAdapter::new("key");
        let mut session = ChatSession::default();
        let call = ToolCallInfo::new("multiply", Map::new());

        adapter.append_tool_result(&mut session, &call, &ToolResult::text("45"));

        let value = serde_json::to_value(&session.outgoing()[0]).unwrap();
        assert_eq!(value["functionResponse"]["name"], "multiply");
        assert_eq!(value["functionResponse"]["response"]["result"][0]["text"], "45");
    }

    #[tokio::test]
    async fn test_session_records_turns_across_sends() {
        let bodies = Arc::new(Mutex::new(Vec::<Value>::new()));
        let captured = bodies.clone();
        let replies = Arc::new(Mutex::new(vec![
            json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": "9" }] } }] }),
            function_call_reply(),
        ]));
        let router = Router::new().route(
            "/models/{call}",
            post(
                move |Path(call): Path<String>, Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>| {
                    let captured = captured.clone();
                    let replies = replies.clone();
                    async move {
                        assert_eq!(call, "gemini-2.5-flash:generateContent");
                        assert_eq!(query["key"], "g-key");
                        captured.lock().unwrap().push(body);
                        Json(replies.lock().unwrap().pop().unwrap())
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let adapter = GeminiAdapter::new("g-key").with_base_url(format!("http://{addr}"));
        let tools = adapter.convert_tools(&[ToolDescriptor::new("multiply", "Multiply", json!({ "type": "object" }))]);
        let mut session = adapter.create_initial_state("What is 15 * 3 / 5?");

        let first = adapter.send(DEFAULT_MODEL, &mut session, &tools).await.unwrap();
        let call = adapter.parse(&first).unwrap().tool_call.unwrap();
        adapter.append_assistant_turn(&mut session, &first);
        adapter.append_tool_result(&mut session, &call, &ToolResult::text("45"));
        let second = adapter.send(DEFAULT_MODEL, &mut session, &tools).await.unwrap();

        assert_eq!(adapter.extract_final_text(&second).unwrap(), "9");
        assert_eq!(session.history().len(), 4);
        assert!(session.outgoing().is_empty());

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies[0]["contents"].as_array().unwrap().len(), 1);
        assert!(bodies[0]["systemInstruction"]["parts"][0]["text"].as_str().unwrap().contains("ReAct"));
        let second_contents = bodies[1]["contents"].as_array().unwrap();
        assert_eq!(second_contents.len(), 3);
        assert_eq!(second_contents[1]["role"], "model");
        assert_eq!(second_contents[1]["parts"][1]["thoughtSignature"], "sig");
        assert_eq!(second_contents[2]["parts"][0]["functionResponse"]["name"], "multiply");

        let count = |key: &str| {
            second_contents
                .iter()
                .flat_map(|c| c["parts"].as_array().unwrap())
                .filter(|p| p.get(key).is_some())
                .count()
        };
        assert_eq!(count("functionCall"), 1);
        assert_eq!(count("functionCall"), count("functionResponse"));
    }

    #[test]
    fn test_commit_drops_unanswered_calls() {
        let mut session = ChatSession::default();
        let reply = response(function_call_reply()).content().unwrap().clone();
        session.commit(reply);

        let parts = &session.history()[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("Multiply first."));
        assert_eq!(parts[1].function_call.as_ref().unwrap().name, "multiply");
        assert_eq!(parts[1].extra["thoughtSignature"], "sig");
    }

    #[tokio::test]
    async fn test_send_maps_http_status() {
        let router = Router::new()
            .route("/auth/models/{call}", post(|| async { (StatusCode::FORBIDDEN, "key rejected") }))
            .route("/busy/models/{call}", post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota") }))
            .route("/down/models/{call}", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let send = |path: &str| {
            let adapter = GeminiAdapter::new("k").with_base_url(format!("http://{addr}/{path}"));
            async move {
                let mut session = adapter.create_initial_state("x");
                adapter.send(DEFAULT_MODEL, &mut session, &[]).await.unwrap_err()
            }
        };

        assert!(matches!(send("auth").await, AgentError::Auth(_)));
        assert!(matches!(send("busy").await, AgentError::RateLimited(_)));
        assert!(matches!(send("down").await, AgentError::Provider(_)));
    }
}
