//! Application settings read from the environment.
//!
//! Built once at startup (after `.env` has been loaded) and passed around
//! explicitly.

use std::path::PathBuf;

#[cfg(feature = "ollama")]
use crate::ollama::OllamaConfig;

pub const DEFAULT_SERVERS_PATH: &str = "mcp-servers.json";

#[derive(Clone, Debug, Default)]
pub struct Settings {
    /// Tool-server configuration file (`MCP_SERVERS_PATH`)
    pub mcp_servers_path: PathBuf,
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint override (`OPENAI_BASE_URL`)
    pub openai_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    #[cfg(feature = "ollama")]
    pub ollama: OllamaConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            mcp_servers_path: non_empty("MCP_SERVERS_PATH")
                .unwrap_or_else(|| DEFAULT_SERVERS_PATH.to_string())
                .into(),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            #[cfg(feature = "ollama")]
            ollama: OllamaConfig::from_lookup(&lookup),
        }
    }
}
