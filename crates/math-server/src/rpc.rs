//! JSON-RPC dispatch shared by both transports.

use serde_json::{Map, Value, json};

use crate::tools::{self, ToolError};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

pub fn error_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// Whether `message` opens a session
pub fn is_initialize(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("initialize")
}

/// Handle one incoming message. Notifications and stray responses get no reply.
pub fn handle(message: &Value) -> Option<Value> {
    let Some(obj) = message.as_object() else {
        return Some(error_response(Value::Null, INVALID_REQUEST, "message must be an object"));
    };
    let id = obj.get("id").cloned();
    let Some(method) = obj.get("method").and_then(Value::as_str) else {
        return id.map(|id| error_response(id, INVALID_REQUEST, "missing method"));
    };
    let Some(id) = id else {
        tracing::debug!(method, "Notification received");
        return None;
    };

    let empty = Map::new();
    let params = obj.get("params").and_then(Value::as_object).unwrap_or(&empty);

    tracing::debug!(method, %id, "Request received");
    Some(match method {
        "initialize" => success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": { "name": "math-server", "version": env!("CARGO_PKG_VERSION") }
            }),
        ),
        "ping" => success(id, json!({})),
        "tools/list" => success(id, json!({ "tools": tools::descriptors() })),
        "tools/call" => call_tool(id, params),
        other => error_response(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    })
}

fn call_tool(id: Value, params: &Map<String, Value>) -> Value {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return error_response(id, INVALID_PARAMS, "missing tool name");
    };
    let empty = Map::new();
    let arguments = params
        .get("arguments")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    match tools::call(name, arguments) {
        Ok(number) => {
            tracing::info!(tool = name, result = %number.to_value(), "Tool executed");
            success(
                id,
                json!({
                    "content": [{ "type": "text", "text": number.to_value().to_string() }],
                    "isError": false
                }),
            )
        }
        Err(ToolError::Execution(message)) => {
            tracing::warn!(tool = name, error = %message, "Tool failed");
            success(
                id,
                json!({
                    "content": [{ "type": "text", "text": message }],
                    "isError": true
                }),
            )
        }
        Err(e) => error_response(id, INVALID_PARAMS, e.to_string()),
    }
}
