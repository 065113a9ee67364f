//! JSON-RPC over HTTP transport.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};

use super::{ProviderError, DISCONNECTED};

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ProviderError>,
}

/// Minimal JSON-RPC 2.0 client, one HTTP request per call.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        JsonRpcClient {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, url = %self.url, "json-rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(DISCONNECTED, e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::new(DISCONNECTED, e.to_string()))?;

        // Error statuses usually still carry a JSON-RPC error object
        let response: JsonRpcResponse = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::new(
                    DISCONNECTED,
                    format!("Request failed with status {status}: {text}"),
                ))
            }
            Err(e) => {
                return Err(ProviderError::internal(format!(
                    "invalid {method} response: {e}"
                )))
            }
        };

        match response {
            JsonRpcResponse {
                error: Some(error), ..
            } => {
                tracing::debug!(method, id, code = error.code, "json-rpc error");
                Err(error)
            }
            JsonRpcResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
        }
    }
}
