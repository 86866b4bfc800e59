//! Camera tool client

use crate::endpoint::ToolEndpoint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A photo returned by the camera tool.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// MIME type reported by the camera server
    pub mime_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Capture parameters passed to the camera server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Camera device index
    #[serde(default)]
    pub device_index: u32,
    /// Capture width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Capture height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Frames discarded while the sensor settles
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_warmup_frames() -> u32 {
    10
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
        }
    }
}

/// Photo capture capability.
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Take a photo of the current physical setup.
    async fn take_photo(&self) -> Result<CapturedImage>;
}

/// Camera client speaking the tool protocol over HTTP.
pub struct CameraClient {
    endpoint: ToolEndpoint,
    settings: CameraSettings,
}

impl CameraClient {
    /// Create a new camera client.
    pub fn new(endpoint: ToolEndpoint, settings: CameraSettings) -> Self {
        Self { endpoint, settings }
    }
}

#[async_trait::async_trait]
impl Camera for CameraClient {
    async fn take_photo(&self) -> Result<CapturedImage> {
        let params = serde_json::to_value(&self.settings)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        let result = self.endpoint.call("take_photo", params).await?;

        let (data, mime_type) = result
            .first_image()
            .ok_or_else(|| Error::Device("camera returned no image content".to_string()))?;

        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::Device(format!("camera returned invalid image data: {}", e)))?;

        Ok(CapturedImage {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CameraSettings::default();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.width, 1920);
        assert_eq!(settings.height, 1080);
        assert_eq!(settings.warmup_frames, 10);
    }

    #[test]
    fn test_settings_deserialization_fills_defaults() {
        let settings: CameraSettings = serde_json::from_str(r#"{"device_index": 2}"#).unwrap();
        assert_eq!(settings.device_index, 2);
        assert_eq!(settings.width, 1920);
    }
}
