//! # agent-core
//!
//! Tool-server registry, tool routing and a provider-agnostic ReAct loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          McpAgent                            │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Reasoning  │  │  ServerRegistry  │  │ BackendAdapter  │  │
//! │  │    Loop     │──│   + ToolRouter   │──│   (Strategy)    │  │
//! │  └─────────────┘  └──────────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `BackendAdapter` trait lets OpenAI, Gemini, Ollama or any other
//! provider drive the same loop. `SessionConnector` hides the transport used
//! to reach each tool server.

pub mod audit;
pub mod config;
pub mod error;
pub mod provider;
pub mod reasoning;
pub mod registry;
pub mod router;
pub mod session;
pub mod tool;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{AuditSink, CallOutcome, MemoryAudit, ToolCallRecord, TracingAudit};
pub use config::{ConfigSource, McpConfig, ServerConfig, TransportKind};
pub use error::{AgentError, Result};
pub use provider::{BackendAdapter, REACT_SYSTEM_PROMPT};
pub use reasoning::{AgentBuilder, AgentConfig, McpAgent};
pub use registry::{ServerConnection, ServerRegistry};
pub use router::{RoutingTable, ToolRouter};
pub use session::{SessionConnector, ToolSession};
pub use tool::{ReActStep, ToolCallInfo, ToolDescriptor, ToolResult};
