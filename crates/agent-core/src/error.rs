//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport setup or protocol handshake with a tool server failed
    #[error("Connection to server '{server}' failed: {message}")]
    Connection { server: String, message: String },

    /// No connected server advertises the requested tool
    #[error("Tool '{0}' not found in any connected server")]
    ToolNotFound(String),

    /// Provider response could not be interpreted as a ReAct step
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The owning tool server reported a failure
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The model kept requesting tools past the configured cap
    #[error("Maximum tool calls ({0}) reached")]
    LoopExceeded(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tool-server transport failure outside the handshake or a tool call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn connection(server: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            server: server.into(),
            message: message.to_string(),
        }
    }

    pub fn tool_execution(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection { server, .. } => {
                format!("Could not connect to the tool server '{server}'.")
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolExecution { tool, message } => format!("Tool '{tool}' failed: {message}"),
            Self::MalformedResponse(_) => "The AI service returned a response that could not be understood.".into(),
            Self::LoopExceeded(_) => "The request took too many steps to process. Please try a simpler query.".into(),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
