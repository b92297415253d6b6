//! # agent-runtime
//!
//! Concrete collaborators for the `agent-core` engine.
//!
//! ## MCP
//!
//! [`McpConnector`] opens sessions to tool servers over streamable HTTP or
//! the legacy SSE transport, depending on each server's configuration.
//!
//! ## Providers
//!
//! - **OpenAI** (`openai` feature): Chat Completions with function tools
//! - **Gemini** (`gemini` feature): `generateContent` with a stateful chat session
//! - **Ollama** (`ollama` feature): local inference via `/api/chat`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{McpConnector, OpenAiAdapter};
//!
//! let mut agent = AgentBuilder::new(OpenAiAdapter::new(api_key))
//!     .connector(Arc::new(McpConnector::new()))
//!     .build()?;
//! agent.load_from_config(&McpConfig::from_file("mcp-servers.json")?).await?;
//! ```

#[cfg(any(feature = "openai", feature = "gemini", feature = "ollama"))]
mod api;
pub mod mcp;
pub mod settings;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gemini")]
pub use gemini::GeminiAdapter;
pub use mcp::McpConnector;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaAdapter, OllamaConfig};
#[cfg(feature = "openai")]
pub use openai::OpenAiAdapter;
pub use settings::Settings;

// Re-export core types for convenience
pub use agent_core::{
    AgentBuilder, AgentConfig, AgentError, BackendAdapter, McpAgent, McpConfig, Result, ServerConfig,
    TransportKind,
};
