//! Application State

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

/// Shared application state
#[derive(Clone, Default)]
pub struct AppState {
    /// Streamable HTTP sessions issued on `initialize`
    http_sessions: Arc<Mutex<HashSet<String>>>,

    /// Open SSE streams, keyed by the `session_id` in their POST endpoint
    sse_sessions: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_http_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        lock(&self.http_sessions).insert(id.clone());
        id
    }

    pub fn has_http_session(&self, id: &str) -> bool {
        lock(&self.http_sessions).contains(id)
    }

    pub fn close_http_session(&self, id: &str) -> bool {
        lock(&self.http_sessions).remove(id)
    }

    pub fn open_sse_session(&self) -> (String, mpsc::UnboundedReceiver<Value>) {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.sse_sessions).insert(id.clone(), tx);
        (id, rx)
    }

    pub fn sse_sender(&self, id: &str) -> Option<mpsc::UnboundedSender<Value>> {
        lock(&self.sse_sessions).get(id).cloned()
    }

    pub fn close_sse_session(&self, id: &str) {
        lock(&self.sse_sessions).remove(id);
    }

    pub fn session_counts(&self) -> (usize, usize) {
        (lock(&self.http_sessions).len(), lock(&self.sse_sessions).len())
    }
}
