//! HTTP plumbing shared by the provider adapters.

use agent_core::{AgentError, Result};
use serde::de::DeserializeOwned;

/// Send `request` and decode a JSON body, mapping failures onto the error
/// taxonomy every adapter shares.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        if e.is_connect() || e.is_timeout() {
            AgentError::ProviderUnavailable(format!("{provider}: {e}"))
        } else {
            AgentError::Provider(format!("{provider}: {e}"))
        }
    })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider, status, body = %body, "Provider returned error");
        return Err(status_error(provider, status, &body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AgentError::Provider(format!("{provider}: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| AgentError::MalformedResponse(format!("{provider}: {e}")))
}

pub(crate) fn status_error(provider: &str, status: u16, body: &str) -> AgentError {
    let excerpt: String = body.chars().take(300).collect();
    match status {
        401 | 403 => AgentError::Auth(format!("{provider}: {excerpt}")),
        429 => AgentError::RateLimited(format!("{provider}: {excerpt}")),
        _ => AgentError::Provider(format!("{provider} returned HTTP {status}: {excerpt}")),
    }
}
