//! Tool protocol types
//!
//! JSON-RPC 2.0 based request/response types shared by all tool servers.

use serde::{Deserialize, Serialize};

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request method (tool operation name)
    pub method: String,
    /// Request ID
    pub id: u64,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RpcRequest {
    /// Create a new request
    pub fn new(method: impl Into<String>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            id,
            params: None,
        }
    }

    /// Add parameters
    #[must_use]
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Response ID (matches request ID)
    pub id: u64,
    /// Result (on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error (on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Tool call result payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Content items
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// First text content item, if any
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ToolContent::as_text)
    }

    /// First image content item, if any
    #[must_use]
    pub fn first_image(&self) -> Option<(&str, &str)> {
        self.content.iter().find_map(|c| match c {
            ToolContent::Image { data, mime_type } => Some((data.as_str(), mime_type.as_str())),
            ToolContent::Text { .. } => None,
        })
    }
}

/// Tool content item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// Text content
        text: String,
    },
    /// Image content
    #[serde(rename = "image")]
    Image {
        /// Base64 encoded image data
        data: String,
        /// MIME type
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ToolContent {
    /// Get text representation of content
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolContent::Text { text } => Some(text),
            ToolContent::Image { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_request_serialization() {
        let request = RpcRequest::new("take_photo", 1)
            .with_params(serde_json::json!({"device_index": 0}));
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"take_photo\""));
        assert!(json.contains("\"device_index\":0"));
    }

    #[test]
    fn test_tool_result_deserialization() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "{\"run_id\": \"abc\"}"},
                {"type": "image", "data": "aGVsbG8=", "mimeType": "image/jpeg"}
            ],
            "isError": false
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("{\"run_id\": \"abc\"}"));
        let (data, mime) = result.first_image().unwrap();
        assert_eq!(data, "aGVsbG8=");
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn test_rpc_error_roundtrip() {
        let response = RpcResponse {
            jsonrpc: "2.0".to_string(),
            id: 7,
            result: None,
            error: Some(RpcError {
                code: -32000,
                message: "camera busy".to_string(),
                data: None,
            }),
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: RpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.error.unwrap().message, "camera busy");
    }
}
