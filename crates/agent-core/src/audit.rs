//! Timing and Audit Wrappers
//!
//! Higher-order helpers that wrap any async operation with start/end logs and
//! elapsed time, and record every tool dispatch for observability. They never
//! alter the wrapped result: errors are logged and handed straight back.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::tool::ToolResult;

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Run `fut`, logging `[START]`, `[END]` or `[ERROR]` with elapsed time
pub async fn timed<F, T>(operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    tracing::info!(target: "mcp_client", "[START] {}", operation);

    let result = fut.await;
    let elapsed = millis(start.elapsed());
    match &result {
        Ok(_) => tracing::info!(target: "mcp_client", "[END] {} - {:.3}ms", operation, elapsed),
        Err(e) => tracing::error!(
            target: "mcp_client",
            "[ERROR] {} - {:.3}ms - {}",
            operation,
            elapsed,
            e
        ),
    }
    result
}

/// How a dispatched tool call ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// Result summary
    Success(String),
    /// Error message
    Failure(String),
}

impl CallOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One audited tool dispatch
#[derive(Clone, Debug)]
pub struct ToolCallRecord {
    /// Position in the conversation, starting at 1
    pub index: usize,
    pub tool: String,
    pub arguments: Map<String, Value>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: CallOutcome,
}

/// Receives audit records
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &ToolCallRecord);
}

/// Writes records to the `tool_call` tracing target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, record: &ToolCallRecord) {
        let elapsed = millis(record.elapsed);
        match &record.outcome {
            CallOutcome::Success(summary) => tracing::info!(
                target: "tool_call",
                "#{} Tool result: {} ({:.3}ms)",
                record.index,
                summary,
                elapsed
            ),
            CallOutcome::Failure(error) => tracing::error!(
                target: "tool_call",
                "#{} Tool error: {} - {} ({:.3}ms)",
                record.index,
                record.tool,
                error,
                elapsed
            ),
        }
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<ToolCallRecord>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ToolCallRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.records().iter().map(|r| r.index).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: &ToolCallRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Run a tool dispatch, timing it and handing a record to `sink`
pub async fn audited<F>(
    index: usize,
    tool: &str,
    arguments: &Map<String, Value>,
    sink: &dyn AuditSink,
    fut: F,
) -> Result<ToolResult>
where
    F: Future<Output = Result<ToolResult>>,
{
    tracing::info!(
        target: "tool_call",
        "#{} Tool called: {}({})",
        index,
        tool,
        serde_json::Value::Object(arguments.clone())
    );

    let started_at = Utc::now();
    let start = Instant::now();
    let result = fut.await;

    let outcome = match &result {
        Ok(output) => CallOutcome::Success(output.summary()),
        Err(e) => CallOutcome::Failure(e.to_string()),
    };
    sink.record(&ToolCallRecord {
        index,
        tool: tool.to_string(),
        arguments: arguments.clone(),
        started_at,
        elapsed: start.elapsed(),
        outcome,
    });

    result
}
