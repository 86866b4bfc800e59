//! Tool endpoint transport
//!
//! One `ToolEndpoint` per tool server (camera, robot). Calls are plain
//! HTTP POSTs carrying JSON-RPC requests; every call is bounded by the
//! endpoint timeout and a timeout maps to a recoverable [`Error::Timeout`].

use crate::error::{Error, Result};
use crate::protocol::{RpcRequest, RpcResponse, ToolCallResult};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// A connection to a single tool server.
pub struct ToolEndpoint {
    /// Server name (for logging)
    name: String,
    /// Server URL
    url: String,
    client: Client,
    timeout_ms: u64,
    next_id: AtomicU64,
}

impl ToolEndpoint {
    /// Create a new endpoint.
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
            timeout_ms: timeout.as_millis() as u64,
            next_id: AtomicU64::new(1),
        })
    }

    /// Server name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke a named operation on the tool server.
    pub async fn call(&self, method: &str, params: serde_json::Value) -> Result<ToolCallResult> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, id).with_params(params);

        debug!(server = %self.name, method = %method, id, "tool call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout_ms)
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "{} returned HTTP {}",
                self.name, status
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| Error::Execution(format!("invalid tool response: {}", e)))?;

        if let Some(error) = rpc.error {
            return Err(Error::Server {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| Error::Execution("tool response had no result".to_string()))?;

        let call_result: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| Error::Execution(format!("invalid tool result: {}", e)))?;

        if call_result.is_error {
            let detail = call_result
                .first_text()
                .unwrap_or("tool reported an error")
                .to_string();
            return Err(Error::Device(detail));
        }

        Ok(call_result)
    }
}
