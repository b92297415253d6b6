//! Full ReAct conversations through real MCP transports.

mod common;

use std::sync::Arc;

use agent_core::{AgentBuilder, AgentError, MemoryAudit, ServerConfig};
use agent_runtime::McpConnector;
use common::{PlannedAdapter, Step, args, http_config, spawn_server, sse_config};

async fn run(server: ServerConfig) {
    let audit = Arc::new(MemoryAudit::new());
    let adapter = PlannedAdapter::new(vec![
        Step::Call("multiply", args(15, 3)),
        Step::Call("divide", args(45, 5)),
        Step::Conclude,
    ]);
    let mut agent = AgentBuilder::new(adapter)
        .connector(Arc::new(McpConnector::new()))
        .audit(audit.clone())
        .build()
        .unwrap();

    agent.add_server(&server).await.unwrap();
    let answer = agent
        .chat("What is 15 multiplied by 3, then divided by 5?", None)
        .await
        .unwrap();

    assert!(answer.contains('9'), "unexpected answer: {answer}");
    assert_eq!(*agent.adapter().sends.lock().unwrap(), 3);
    assert_eq!(audit.indices(), [1, 2]);
    assert!(audit.records().iter().all(|r| r.outcome.is_success()));

    agent.cleanup().await;
    assert!(agent.registry().is_empty());
}

#[tokio::test]
async fn test_math_conversation_over_http() {
    let base = spawn_server().await;
    run(http_config(&base)).await;
}

#[tokio::test]
async fn test_math_conversation_over_sse() {
    let base = spawn_server().await;
    run(sse_config(&base)).await;
}

#[tokio::test]
async fn test_division_by_zero_is_observed_not_fatal() {
    let base = spawn_server().await;
    let adapter = PlannedAdapter::new(vec![Step::Call("divide", args(1, 0)), Step::Conclude]);
    let mut agent = AgentBuilder::new(adapter)
        .connector(Arc::new(McpConnector::new()))
        .build()
        .unwrap();
    agent.add_server(&http_config(&base)).await.unwrap();

    let answer = agent.chat("Divide 1 by 0", None).await.unwrap();
    assert!(answer.contains("Cannot divide by zero."));
    agent.cleanup().await;
}

#[tokio::test]
async fn test_unknown_tool_ends_the_conversation() {
    let base = spawn_server().await;
    let mut extra = serde_json::Map::new();
    extra.insert("x".into(), 1.into());
    let adapter = PlannedAdapter::new(vec![Step::Call("add", args(1, 1)), Step::Call("sqrt", extra), Step::Conclude]);
    let mut agent = AgentBuilder::new(adapter)
        .connector(Arc::new(McpConnector::new()))
        .build()
        .unwrap();
    agent.add_server(&sse_config(&base)).await.unwrap();

    let err = agent.chat("go", None).await.unwrap_err();
    assert!(matches!(err, AgentError::ToolNotFound(name) if name == "sqrt"));
    assert_eq!(*agent.adapter().sends.lock().unwrap(), 2);
    agent.cleanup().await;
}
