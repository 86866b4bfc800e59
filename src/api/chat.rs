//! Chat API endpoints
//!
//! POST /api/chat/start               - Start a session from a protocol script
//! POST /api/chat/message             - Send an operator message
//! GET  /api/chat/history/:id         - Ordered conversation transcript
//! GET  /api/chat/image/:id/:index    - Raw captured image bytes

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use platecheck_core::{SessionHistory, VerificationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{core_error_status, ApiResponse, AppState};

/// Request to start a chat session.
#[derive(Debug, Deserialize)]
pub struct StartChatRequest {
    /// Display name of the protocol script
    pub protocol_name: String,
    /// Full protocol source text
    pub protocol_text: String,
}

/// Response from starting a session.
#[derive(Debug, Serialize)]
pub struct StartChatResponse {
    pub session_id: Uuid,
    pub message: String,
    pub protocol_name: String,
}

/// Request to send a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub session_id: Uuid,
    pub message: String,
}

/// Response from sending a message.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<VerificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub protocol_executed: bool,
}

/// Start a new chat session.
async fn start_chat(
    State(state): State<AppState>,
    Json(request): Json<StartChatRequest>,
) -> (StatusCode, Json<ApiResponse<StartChatResponse>>) {
    match state
        .orchestrator
        .start_session(&request.protocol_name, &request.protocol_text)
        .await
    {
        Ok(started) => (
            StatusCode::OK,
            Json(ApiResponse::success(StartChatResponse {
                session_id: started.session_id,
                message: started.greeting,
                protocol_name: request.protocol_name,
            })),
        ),
        Err(e) => (core_error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Send an operator message to a session.
async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> (StatusCode, Json<ApiResponse<SendMessageResponse>>) {
    match state
        .orchestrator
        .handle_message(request.session_id, &request.message)
        .await
    {
        Ok(reply) => (
            StatusCode::OK,
            Json(ApiResponse::success(SendMessageResponse {
                message: reply.reply,
                image_index: reply.image_index,
                checkpoints: reply.verification,
                action: reply.action,
                protocol_executed: reply.executed,
            })),
        ),
        Err(e) => (core_error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Conversation transcript for a session.
async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<SessionHistory>>) {
    match state.orchestrator.history(session_id).await {
        Ok(history) => (StatusCode::OK, Json(ApiResponse::success(history))),
        Err(e) => (core_error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Raw bytes of a captured image.
async fn get_image(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> Response {
    match state.orchestrator.image(session_id, index).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.mime_type)], image.bytes).into_response(),
        Err(e) => (
            core_error_status(&e),
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response(),
    }
}

/// Create chat routes.
pub fn chat_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/start", post(start_chat))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/history/:session_id", get(get_history))
        .route("/api/chat/image/:session_id/:index", get(get_image))
        .with_state(state)
}
