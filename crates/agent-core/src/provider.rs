//! Backend Adapter Strategy
//!
//! Defines the contract every LLM provider implements so the ReAct loop can
//! drive it without knowing its wire format.
//!
//! Each adapter picks its own native types:
//!
//! - `Tool`: the provider's function-calling declaration
//! - `State`: the running conversation, opaque to the loop. It may be an
//!   explicit message list or a stateful chat session that records history
//!   itself.
//! - `Response`: one raw model reply
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::{AgentBuilder, BackendAdapter};
//!
//! let mut agent = AgentBuilder::new(OpenAiAdapter::new(api_key))
//!     .connector(Arc::new(McpConnector::new()))
//!     .build()?;
//! agent.load_from_config(&config).await?;
//! let answer = agent.chat("What is 15 multiplied by 3?", None).await?;
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::tool::{ReActStep, ToolCallInfo, ToolDescriptor, ToolResult};

/// System instruction establishing the ReAct behaviour
pub const REACT_SYSTEM_PROMPT: &str = "You are a helpful assistant that follows the ReAct pattern.
For each step, you MUST:
1. Think: Reason about what to do next based on the current state
2. Act: Call exactly ONE tool if needed
3. Observe: Process the tool result before deciding next action

Always explain your reasoning before taking an action.
Call only ONE tool at a time, then wait for the result before proceeding.";

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for a new backend. The loop calls
/// `send` once per model turn and never loops inside an adapter.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Provider-native tool declaration
    type Tool: Send + Sync;

    /// Conversation state threaded between calls
    type State: Send;

    /// Raw provider reply
    type Response: Send + Sync;

    /// Provider name for logs
    fn name(&self) -> &str;

    /// Model used when the caller does not pick one
    fn default_model(&self) -> &str;

    /// Map neutral descriptors to the provider's declaration format
    fn convert_tools(&self, descriptors: &[ToolDescriptor]) -> Vec<Self::Tool>;

    /// Seed a conversation with the ReAct instruction and the user input
    fn create_initial_state(&self, user_input: &str) -> Self::State;

    /// Exactly one request/response round trip. An empty `tools` slice means
    /// no tools are offered.
    async fn send(
        &self,
        model: &str,
        state: &mut Self::State,
        tools: &[Self::Tool],
    ) -> Result<Self::Response>;

    /// Extract reasoning and at most one tool call. Extra tool calls in the
    /// same reply are ignored.
    fn parse(&self, response: &Self::Response) -> Result<ReActStep>;

    /// Fold the model's own turn into the state
    fn append_assistant_turn(&self, state: &mut Self::State, response: &Self::Response);

    /// Fold a tool result into the state for the next `send`
    fn append_tool_result(
        &self,
        state: &mut Self::State,
        call: &ToolCallInfo,
        result: &ToolResult,
    );

    /// User-facing text of the terminal reply
    fn extract_final_text(&self, response: &Self::Response) -> Result<String>;
}
