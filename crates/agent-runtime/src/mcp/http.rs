//! Streamable HTTP transport: one POST per JSON-RPC message.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use agent_core::ServerConfig;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde_json::Value;

use super::event::SseDecoder;
use super::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcError};
use super::transport::{RequestIds, RpcTransport, check_status, decode_response, header_map};

pub const SESSION_HEADER: &str = "mcp-session-id";

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    timeout: Duration,
    session_id: Mutex<Option<String>>,
    ids: RequestIds,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Result<Self, RpcError> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            headers: header_map(&config.headers)?,
            timeout: config.timeout(),
            session_id: Mutex::new(None),
            ids: RequestIds::default(),
        })
    }

    /// Session id assigned by the server, once `initialize` has run
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .timeout(self.timeout);
        if let Some(id) = self.session_id() {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder
    }

    async fn send(&self, body: &impl serde::Serialize) -> Result<reqwest::Response, RpcError> {
        let response = self.post().json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout(self.timeout)
            } else {
                RpcError::Http(e)
            }
        })?;
        let response = check_status(response).await?;

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
        }
        Ok(response)
    }
}

/// Pick the response carrying `id` out of a JSON or event-stream body
fn response_for(id: u64, content_type: &str, body: &str) -> Result<JsonRpcResponse, RpcError> {
    if content_type.starts_with("text/event-stream") {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(body.as_bytes());
        events.extend(decoder.finish());

        return events
            .iter()
            .filter(|e| e.event == "message")
            .filter_map(|e| decode_response(&e.data).ok())
            .find(|r| r.id == Some(id) && r.is_response())
            .ok_or_else(|| RpcError::Protocol(format!("no response for request {id} in event stream")));
    }

    match serde_json::from_str::<Value>(body).map_err(|e| RpcError::Decode(e.to_string()))? {
        Value::Array(batch) => batch
            .into_iter()
            .filter_map(|v| serde_json::from_value::<JsonRpcResponse>(v).ok())
            .find(|r| r.id == Some(id) && r.is_response())
            .ok_or_else(|| RpcError::Protocol(format!("no response for request {id} in batch"))),
        single => serde_json::from_value(single).map_err(|e| RpcError::Decode(e.to_string())),
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.ids.next();
        let response = self.send(&JsonRpcRequest::new(id, method, params)).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response.text().await?;

        tracing::trace!(target: "mcp_client", method, id, "HTTP response received");
        response_for(id, &content_type, &body)?.into_result()
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        self.send(&JsonRpcNotification::new(method, params)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RpcError> {
        let Some(id) = self
            .session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        let response = self
            .client
            .delete(&self.url)
            .headers(self.headers.clone())
            .header(SESSION_HEADER, id)
            .timeout(self.timeout)
            .send()
            .await?;

        // 405: server does not support explicit termination
        if response.status() != reqwest::StatusCode::METHOD_NOT_ALLOWED {
            check_status(response).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#;
        let response = response_for(3, "application/json", body).unwrap();
        assert_eq!(response.id, Some(3));
        assert_eq!(response.into_result().unwrap()["ok"], true);
    }

    #[test]
    fn test_response_from_event_stream_body() {
        let body = concat!(
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":5,\"result\":{\"tools\":[]}}\n\n",
        );
        let response = response_for(5, "text/event-stream; charset=utf-8", body).unwrap();
        assert_eq!(response.into_result().unwrap()["tools"], serde_json::json!([]));

        assert!(matches!(
            response_for(6, "text/event-stream", body),
            Err(RpcError::Protocol(_))
        ));
    }

    #[test]
    fn test_server_request_in_batch_is_skipped() {
        let body = r#"[{"jsonrpc":"2.0","id":2,"method":"ping"},{"jsonrpc":"2.0","id":2,"result":{"ok":1}}]"#;
        let response = response_for(2, "application/json", body).unwrap();
        assert_eq!(response.into_result().unwrap()["ok"], 1);
    }

    #[test]
    fn test_garbage_body() {
        assert!(matches!(
            response_for(1, "application/json", "<html>"),
            Err(RpcError::Decode(_))
        ));
    }
}
