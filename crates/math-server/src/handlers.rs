//! HTTP/SSE Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::rpc;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";

fn rpc_failure(status: StatusCode, code: i64, message: &str) -> Response {
    (status, Json(rpc::error_response(Value::Null, code, message))).into_response()
}

fn parse(body: &str) -> Result<Value, Response> {
    serde_json::from_str(body).map_err(|e| {
        rpc_failure(StatusCode::BAD_REQUEST, rpc::PARSE_ERROR, &format!("Parse error: {e}"))
    })
}

// ============================================================================
// Streamable HTTP
// ============================================================================

/// `POST /mcp`: one JSON-RPC message per request
pub async fn mcp_post(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let message = match parse(&body) {
        Ok(message) => message,
        Err(response) => return response,
    };

    let issued = if rpc::is_initialize(&message) {
        Some(state.open_http_session())
    } else {
        match headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
            Some(id) if state.has_http_session(id) => None,
            Some(_) => {
                return rpc_failure(StatusCode::NOT_FOUND, rpc::INVALID_REQUEST, "Session not found");
            }
            None => {
                return rpc_failure(StatusCode::BAD_REQUEST, rpc::INVALID_REQUEST, "Missing session id");
            }
        }
    };

    let Some(reply) = rpc::handle(&message) else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut response = Json(reply).into_response();
    if let Some(id) = issued {
        tracing::info!(session = %id, "HTTP session opened");
        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}

/// `DELETE /mcp`: end a streamable HTTP session
pub async fn mcp_delete(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let closed = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|id| state.close_http_session(id));

    if closed {
        tracing::info!("HTTP session closed");
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

// ============================================================================
// SSE
// ============================================================================

/// Removes the session when the client's stream is dropped
struct SseSession {
    state: AppState,
    id: String,
}

impl Drop for SseSession {
    fn drop(&mut self) {
        tracing::info!(session = %self.id, "SSE client disconnected");
        self.state.close_sse_session(&self.id);
    }
}

/// `GET /sse`: announce the POST endpoint, then stream responses
pub async fn sse_connect(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.open_sse_session();
    tracing::info!(session = %id, "SSE client connected");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={id}"));
    let session = SseSession { state, id };

    let messages = UnboundedReceiverStream::new(rx).map(move |message| {
        let _ = &session;
        Ok(Event::default().event("message").data(message.to_string()))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: String,
}

/// `POST /messages?session_id=…`: replies travel back over the stream
pub async fn messages_post(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: String,
) -> Response {
    let Some(sender) = state.sse_sender(&query.session_id) else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };
    let message = match parse(&body) {
        Ok(message) => message,
        Err(response) => return response,
    };

    if let Some(reply) = rpc::handle(&message) {
        if sender.send(reply).is_err() {
            state.close_sse_session(&query.session_id);
            return (StatusCode::GONE, "Session stream closed").into_response();
        }
    }
    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let (http, sse) = state.session_counts();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": { "http": http, "sse": sse }
    }))
}
