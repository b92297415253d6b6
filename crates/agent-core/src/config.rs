//! Tool-Server Configuration
//!
//! Parses the `mcpServers` document into an ordered list of server
//! descriptors. Server order in the document is preserved.
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "math_server": { "url": "http://localhost:8000/sse" },
//!     "search": {
//!       "url": "http://localhost:9000/mcp",
//!       "transport": "http",
//!       "headers": { "Authorization": "Bearer token" },
//!       "timeout": 60
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{AgentError, Result};

/// Default per-request timeout for tool servers, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport used to reach a tool server
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Server-sent event stream plus a POST endpoint
    #[default]
    Sse,
    /// Streamable HTTP: every message is a POST to one endpoint
    Http,
}

impl TransportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Http => "http",
        }
    }

    /// Case-insensitive lookup; `None` for unknown names
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sse" => Some(Self::Sse),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tool server entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Registry key
    pub name: String,

    /// Endpoint (SSE stream URL or streamable-HTTP URL)
    pub url: String,

    pub transport: TransportKind,

    /// Extra HTTP headers sent with every request
    pub headers: HashMap<String, String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport: TransportKind::default(),
            headers: HashMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub const fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    fn from_entry(name: &str, entry: &Value) -> Result<Self> {
        let entry = entry.as_object().ok_or_else(|| {
            AgentError::Config(format!("mcpServers.{name}: expected an object"))
        })?;

        let url = match entry.get("url") {
            Some(Value::String(url)) if !url.trim().is_empty() => url.clone(),
            Some(Value::String(_)) | None => {
                return Err(AgentError::Config(format!("mcpServers.{name}.url: missing")));
            }
            Some(other) => {
                return Err(AgentError::Config(format!(
                    "mcpServers.{name}.url: expected a string, got {other}"
                )));
            }
        };

        let transport = match entry.get("transport") {
            None | Some(Value::Null) => TransportKind::default(),
            Some(Value::String(raw)) => TransportKind::parse(raw).unwrap_or_else(|| {
                tracing::warn!(
                    target: "mcp_client",
                    "Unknown transport '{}' for {}, falling back to 'sse'",
                    raw,
                    name
                );
                TransportKind::Sse
            }),
            Some(other) => {
                return Err(AgentError::Config(format!(
                    "mcpServers.{name}.transport: expected a string, got {other}"
                )));
            }
        };

        let headers = match entry.get("headers") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(v) => Ok((key.clone(), v.clone())),
                    other => Err(AgentError::Config(format!(
                        "mcpServers.{name}.headers.{key}: expected a string, got {other}"
                    ))),
                })
                .collect::<Result<HashMap<_, _>>>()?,
            Some(other) => {
                return Err(AgentError::Config(format!(
                    "mcpServers.{name}.headers: expected an object, got {other}"
                )));
            }
        };

        let timeout_secs = match entry.get("timeout") {
            None | Some(Value::Null) => DEFAULT_TIMEOUT_SECS,
            Some(value) => value.as_u64().ok_or_else(|| {
                AgentError::Config(format!(
                    "mcpServers.{name}.timeout: expected a non-negative integer, got {value}"
                ))
            })?,
        };

        Ok(Self {
            name: name.to_string(),
            url,
            transport,
            headers,
            timeout_secs,
        })
    }
}

/// Full tool-server configuration, servers in document order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct McpConfig {
    pub servers: Vec<ServerConfig>,
}

impl McpConfig {
    pub const fn new(servers: Vec<ServerConfig>) -> Self {
        Self { servers }
    }

    /// Load from an already-parsed JSON document
    pub fn from_value(data: &Value) -> Result<Self> {
        let root = data
            .as_object()
            .ok_or_else(|| AgentError::Config("expected a JSON object at the top level".into()))?;

        let servers = match root.get("mcpServers") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(servers)) => servers,
            Some(other) => {
                return Err(AgentError::Config(format!(
                    "mcpServers: expected an object, got {other}"
                )));
            }
        };

        let servers = servers
            .iter()
            .map(|(name, entry)| {
                let server = ServerConfig::from_entry(name, entry)?;
                tracing::debug!(
                    target: "mcp_client",
                    "Loaded server config: {} -> {} ({})",
                    server.name,
                    server.url,
                    server.transport
                );
                Ok(server)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { servers })
    }

    /// Load from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(json)
            .map_err(|e| AgentError::Config(format!("invalid JSON: {e}")))?;
        Self::from_value(&data)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AgentError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("read {}: {e}", path.display())))?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| AgentError::Config(format!("parse {}: {e}", path.display())))?;

        let config = Self::from_value(&data)?;
        tracing::info!(target: "mcp_client", "Loaded config from file: {}", path.display());
        Ok(config)
    }

    /// Resolve any accepted configuration source
    pub fn resolve(source: ConfigSource) -> Result<Self> {
        match source {
            ConfigSource::Parsed(config) => Ok(config),
            ConfigSource::Value(value) => Self::from_value(&value),
            ConfigSource::Json(json) => Self::from_json(&json),
            ConfigSource::File(path) => Self::from_file(path),
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// The different shapes a configuration can be handed over in
#[derive(Clone, Debug)]
pub enum ConfigSource {
    Parsed(McpConfig),
    Value(Value),
    Json(String),
    File(PathBuf),
}

impl From<McpConfig> for ConfigSource {
    fn from(config: McpConfig) -> Self {
        Self::Parsed(config)
    }
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

/// Text starting with `{` is JSON, anything else is a file path
impl From<&str> for ConfigSource {
    fn from(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            Self::Json(text.to_string())
        } else {
            Self::File(PathBuf::from(text))
        }
    }
}

impl From<String> for ConfigSource {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}
