//! Legacy SSE transport.
//!
//! A long-lived GET stream carries every server message. The first
//! `endpoint` event names the URL requests are POSTed to; responses come
//! back on the stream as `message` events and are routed to the waiting
//! caller by JSON-RPC id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use agent_core::ServerConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::event::{SseDecoder, SseEvent};
use super::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcError};
use super::transport::{RequestIds, RpcTransport, check_status, decode_response, header_map};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

pub struct SseTransport {
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
    timeout: Duration,
    pending: Pending,
    reader: JoinHandle<()>,
    closed: AtomicBool,
    ids: RequestIds,
}

impl SseTransport {
    /// Open the event stream and wait for the server to announce its endpoint
    pub async fn connect(config: &ServerConfig) -> Result<Self, RpcError> {
        let client = reqwest::Client::new();
        let headers = header_map(&config.headers)?;
        let timeout = config.timeout();
        let base = Url::parse(&config.url).map_err(|e| RpcError::Protocol(format!("invalid url: {e}")))?;

        let response = tokio::time::timeout(
            timeout,
            client
                .get(base.clone())
                .headers(headers.clone())
                .header(ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| RpcError::Timeout(timeout))??;
        let response = check_status(response).await?;

        let pending: Pending = Arc::default();
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_stream(response, Arc::clone(&pending), endpoint_tx));

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(path)) => path,
            Ok(Err(_)) => {
                reader.abort();
                return Err(RpcError::Closed);
            }
            Err(_) => {
                reader.abort();
                return Err(RpcError::Timeout(timeout));
            }
        };
        let endpoint = match base.join(&endpoint) {
            Ok(url) => url,
            Err(e) => {
                reader.abort();
                return Err(RpcError::Protocol(format!("invalid endpoint {endpoint}: {e}")));
            }
        };

        tracing::debug!(target: "mcp_client", server = %config.name, %endpoint, "SSE endpoint announced");

        Ok(Self {
            client,
            endpoint,
            headers,
            timeout,
            pending,
            reader,
            closed: AtomicBool::new(false),
            ids: RequestIds::default(),
        })
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, body: &impl serde::Serialize) -> Result<(), RpcError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

async fn read_stream(
    response: reqwest::Response,
    pending: Pending,
    endpoint_tx: oneshot::Sender<String>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(target: "mcp_client", error = %e, "SSE stream error");
                break;
            }
        };
        for event in decoder.push(&chunk) {
            route(event, &pending, &mut endpoint_tx);
        }
    }
    if let Some(event) = decoder.finish() {
        route(event, &pending, &mut endpoint_tx);
    }

    // Dropping the senders fails every request still waiting
    pending.lock().unwrap_or_else(PoisonError::into_inner).clear();
    tracing::debug!(target: "mcp_client", "SSE stream ended");
}

fn route(event: SseEvent, pending: &Pending, endpoint_tx: &mut Option<oneshot::Sender<String>>) {
    match event.event.as_str() {
        "endpoint" => {
            if let Some(tx) = endpoint_tx.take() {
                let _ = tx.send(event.data.trim().to_string());
            }
        }
        "message" => match decode_response(&event.data) {
            Ok(response) => {
                let Some(id) = response.id.filter(|_| response.is_response()) else {
                    tracing::debug!(target: "mcp_client", "Ignoring server-initiated message");
                    return;
                };
                let waiter = pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!(target: "mcp_client", id, "Response for unknown id"),
                }
            }
            Err(e) => tracing::warn!(target: "mcp_client", error = %e, "Unparseable SSE message"),
        },
        other => tracing::trace!(target: "mcp_client", event = other, "Ignoring SSE event"),
    }
}

#[async_trait]
impl RpcTransport for SseTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if self.closed.load(Ordering::Acquire) || self.reader.is_finished() {
            return Err(RpcError::Closed);
        }

        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        if let Err(e) = self.post(&JsonRpcRequest::new(id, method, params)).await {
            self.forget(id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                self.forget(id);
                Err(RpcError::Timeout(self.timeout))
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        self.post(&JsonRpcNotification::new(method, params)).await
    }

    async fn close(&self) -> Result<(), RpcError> {
        self.closed.store(true, Ordering::Release);
        self.reader.abort();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
