//! Streamable HTTP transport against a live server.

mod common;

use std::sync::Arc;

use agent_core::{AgentError, ServerRegistry, ToolSession};
use agent_runtime::mcp::{HttpTransport, McpConnector, McpSession, RpcTransport};
use common::{args, http_config, spawn_server};
use serde_json::json;

#[tokio::test]
async fn test_initialize_assigns_session_id() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/mcp"))
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let session = response.headers()["mcp-session-id"].to_str().unwrap().to_string();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");

    let without_session = client
        .post(format!("{base}/mcp"))
        .json(&json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }))
        .send()
        .await
        .unwrap();
    assert_eq!(without_session.status(), 400);

    let note = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .send()
        .await
        .unwrap();
    assert_eq!(note.status(), 202);

    let deleted = client
        .delete(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let stale = client
        .post(format!("{base}/mcp"))
        .header("mcp-session-id", &session)
        .json(&json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), 404);
}

#[tokio::test]
async fn test_session_round_trip() {
    let base = spawn_server().await;
    let session = McpSession::new("math_server", HttpTransport::new(&http_config(&base)).unwrap());

    session.initialize().await.unwrap();
    assert!(session.transport().session_id().is_some());

    let tools = session.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["add", "subtract", "multiply", "divide"]);

    let product = session.call_tool("multiply", &args(15, 3)).await.unwrap();
    assert_eq!(product.text_content(), "45");
    assert!(!product.is_error);

    let by_zero = session.call_tool("divide", &args(1, 0)).await.unwrap();
    assert!(by_zero.is_error);
    assert_eq!(by_zero.text_content(), "Cannot divide by zero.");

    let unknown = session.call_tool("teleport", &args(1, 1)).await.unwrap_err();
    assert!(matches!(unknown, AgentError::ToolExecution { .. }));

    let err = session.transport().request("resources/list", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("-32601"));

    session.close().await.unwrap();
    assert!(session.transport().session_id().is_none());
}

#[tokio::test]
async fn test_registry_over_http() {
    let base = spawn_server().await;
    let mut registry = ServerRegistry::new(Arc::new(McpConnector::new()));

    registry.add_server(&http_config(&base)).await.unwrap();
    assert_eq!(registry.server_names(), ["math_server"]);
    assert_eq!(registry.list_all_tools().await.unwrap().len(), 4);

    let sum = registry.router().dispatch("add", &args(2, 3)).await.unwrap();
    assert_eq!(sum.text_content(), "5");

    registry.cleanup().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_a_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut registry = ServerRegistry::new(Arc::new(McpConnector::new()));
    let err = registry
        .add_server(&http_config(&format!("http://127.0.0.1:{port}")))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Connection { server, .. } if server == "math_server"));
    assert!(registry.is_empty());
}
