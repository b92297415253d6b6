//! Transport abstraction shared by the HTTP and SSE clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use super::jsonrpc::{JsonRpcResponse, RpcError};

/// Moves JSON-RPC messages to and from one tool server
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send a request and wait for the matching response's `result`
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Send a notification; no response is expected
    async fn notify(&self, method: &str, params: Value) -> Result<(), RpcError>;

    /// Release the connection
    async fn close(&self) -> Result<(), RpcError>;
}

/// Monotonic request ids, starting at 1
#[derive(Debug, Default)]
pub struct RequestIds(AtomicU64);

impl RequestIds {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, RpcError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| RpcError::InvalidHeader(key.clone()))?;
        let value = HeaderValue::from_str(value).map_err(|_| RpcError::InvalidHeader(key.clone()))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Non-2xx responses become `RpcError::Status` with a short body excerpt
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RpcError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RpcError::Status {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

pub fn decode_response(text: &str) -> Result<JsonRpcResponse, RpcError> {
    serde_json::from_str(text).map_err(|e| RpcError::Decode(e.to_string()))
}
