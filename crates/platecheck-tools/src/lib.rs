//! Platecheck Tools - external tool invocation
//!
//! This crate provides the uniform tool-invocation protocol used to reach
//! the camera and robot tool servers:
//! - Protocol: JSON-RPC 2.0 request/response wire types
//! - Endpoint: HTTP transport with per-call timeouts
//! - Camera: photo capture client
//! - Robot: protocol upload-and-run client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod camera;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod robot;

pub use camera::{Camera, CameraClient, CameraSettings, CapturedImage};
pub use endpoint::ToolEndpoint;
pub use error::{Error, Result};
pub use protocol::{RpcError, RpcRequest, RpcResponse, ToolCallResult, ToolContent};
pub use robot::{RobotClient, RobotRunner, RunHandle};
