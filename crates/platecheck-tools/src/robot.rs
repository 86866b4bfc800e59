//! Robot tool client
//!
//! The single side effect in the whole system that touches hardware. A
//! dispatched run whose outcome cannot be read back is reported as
//! [`Error::StatusUnknown`] so the caller can tell the operator to verify
//! manually instead of assuming success.

use crate::endpoint::ToolEndpoint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Handle for a dispatched protocol run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHandle {
    /// Run identifier assigned by the robot controller
    pub run_id: String,
    /// Controller-reported status at dispatch time
    #[serde(default)]
    pub status: Option<String>,
}

/// Robot execution capability.
#[async_trait::async_trait]
pub trait RobotRunner: Send + Sync {
    /// Upload a protocol and start the run.
    async fn upload_and_run(&self, protocol_text: &str) -> Result<RunHandle>;

    /// Health check against the robot controller.
    async fn ping(&self) -> Result<()>;
}

/// Robot client speaking the tool protocol over HTTP.
pub struct RobotClient {
    endpoint: ToolEndpoint,
}

impl RobotClient {
    /// Create a new robot client.
    pub fn new(endpoint: ToolEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait::async_trait]
impl RobotRunner for RobotClient {
    async fn upload_and_run(&self, protocol_text: &str) -> Result<RunHandle> {
        if protocol_text.trim().is_empty() {
            return Err(Error::InvalidInput("protocol text is empty".to_string()));
        }

        let params = serde_json::json!({
            "protocol_text": protocol_text,
            "start": true,
            "wait": false,
        });

        let result = self.endpoint.call("upload_and_run", params).await.map_err(
            // Dispatch may have reached the controller before the transport
            // failed. Timeouts and transport drops after this point are
            // unknown state, not failure.
            |e| match e {
                Error::Timeout(ms) => {
                    Error::StatusUnknown(format!("no response within {}ms after dispatch", ms))
                }
                Error::Network(msg) => {
                    Error::StatusUnknown(format!("connection lost after dispatch: {}", msg))
                }
                other => other,
            },
        )?;

        let text = result.first_text().ok_or_else(|| {
            Error::StatusUnknown("controller acknowledged without run details".to_string())
        })?;

        let handle: RunHandle = serde_json::from_str(text).map_err(|_| {
            Error::StatusUnknown(format!("unparsable controller response: {}", text))
        })?;

        info!(run_id = %handle.run_id, status = ?handle.status, "protocol run dispatched");
        Ok(handle)
    }

    async fn ping(&self) -> Result<()> {
        self.endpoint.call("ping", serde_json::json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_handle_deserialization() {
        let handle: RunHandle =
            serde_json::from_str(r#"{"run_id": "run-42", "status": "running"}"#).unwrap();
        assert_eq!(handle.run_id, "run-42");
        assert_eq!(handle.status.as_deref(), Some("running"));

        let minimal: RunHandle = serde_json::from_str(r#"{"run_id": "run-43"}"#).unwrap();
        assert!(minimal.status.is_none());
    }
}
