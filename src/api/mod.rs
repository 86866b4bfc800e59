//! Web API module for Platecheck
//!
//! Provides REST endpoints for:
//! - Chat sessions (start, message, history, captured images)
//! - Experiment simulation
//! - Health checks

pub mod chat;
pub mod experiments;
pub mod health;

use axum::http::StatusCode;
use axum::Router;
use platecheck_core::ChatOrchestrator;
use platecheck_sim::{ExperimentSimulator, ExperimentStore};
use platecheck_tools::RobotRunner;
use serde::Serialize;
use std::sync::Arc;

pub use chat::chat_routes;
pub use experiments::experiments_routes;
pub use health::health_routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub simulator: Arc<ExperimentSimulator>,
    pub experiments: Arc<ExperimentStore>,
    pub robot: Arc<dyn RobotRunner>,
}

/// Standard API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// HTTP status for a core error.
pub(crate) fn core_error_status(error: &platecheck_core::Error) -> StatusCode {
    use platecheck_core::Error;
    match error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP status for a simulator error.
pub(crate) fn sim_error_status(error: &platecheck_sim::Error) -> StatusCode {
    use platecheck_sim::Error;
    match error {
        Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
    }
}

/// Create the API router with all endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(chat_routes(state.clone()))
        .merge(experiments_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use platecheck_core::OrchestratorConfig;
    use platecheck_llm::{ChatProvider, CompletionRequest, CompletionResponse};
    use platecheck_sim::{ThresholdClassifier, WellJudge};
    use platecheck_tools::{Camera, CapturedImage, RunHandle};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    const CHECKLIST_REPLY: &str = r#"{"checkpoints": [
        {"category": "labware_position", "description": "Tip rack at C2", "expected": "rack at C2"},
        {"category": "trash", "description": "Trash bin at A3", "expected": "bin at A3"}
    ]}"#;
    const ALL_PASS: &str = r#"{"results": [
        {"id": 1, "result": "pass", "details": "rack visible"},
        {"id": 2, "result": "pass", "details": "bin visible"}
    ]}"#;

    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().map(String::from).collect()),
            })
        }
    }

    #[async_trait::async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> platecheck_llm::Result<CompletionResponse> {
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| platecheck_llm::Error::Api("script exhausted".to_string()))?;
            Ok(CompletionResponse {
                content,
                usage: None,
                finish_reason: Some("stop".to_string()),
                model: "scripted-model".to_string(),
            })
        }
    }

    struct FakeCamera;

    #[async_trait::async_trait]
    impl Camera for FakeCamera {
        async fn take_photo(&self) -> platecheck_tools::Result<CapturedImage> {
            Ok(CapturedImage {
                mime_type: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            })
        }
    }

    struct FakeRobot;

    #[async_trait::async_trait]
    impl RobotRunner for FakeRobot {
        async fn upload_and_run(
            &self,
            _protocol_text: &str,
        ) -> platecheck_tools::Result<RunHandle> {
            Ok(RunHandle {
                run_id: "run-7".to_string(),
                status: Some("running".to_string()),
            })
        }

        async fn ping(&self) -> platecheck_tools::Result<()> {
            Ok(())
        }
    }

    fn test_state(chat_replies: Vec<&str>) -> AppState {
        let orchestrator = Arc::new(ChatOrchestrator::new(
            ScriptedProvider::new(chat_replies),
            Arc::new(FakeCamera),
            Arc::new(FakeRobot),
            OrchestratorConfig::default(),
        ));
        let sim_provider = ScriptedProvider::new(vec!["clean"; 64]);
        AppState {
            orchestrator,
            simulator: Arc::new(ExperimentSimulator::new(
                Arc::new(ThresholdClassifier::default()),
                WellJudge::new(sim_provider, "scripted-model"),
            )),
            experiments: Arc::new(ExperimentStore::new()),
            robot: Arc::new(FakeRobot),
        }
    }

    async fn request_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = api_router(test_state(vec![]));
        let (status, body) = request_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_full_chat_flow() {
        let app = api_router(test_state(vec![
            CHECKLIST_REPLY,
            "Hello! Place the tip rack at C2 and the trash bin at A3.",
            ALL_PASS,
            "Everything checks out, the run has started.",
        ]));

        let (status, body) = request_json(
            &app,
            "POST",
            "/api/chat/start",
            Some(json!({"protocol_name": "wash.py", "protocol_text": "protocol body"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["data"]["message"].as_str().unwrap().contains("C2"));
        let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

        let (status, body) = request_json(
            &app,
            "POST",
            "/api/chat/message",
            Some(json!({"session_id": session_id, "message": "setup is done"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["protocol_executed"], true);
        assert_eq!(body["data"]["action"], "protocol_executed");
        assert_eq!(body["data"]["image_index"], 0);
        assert_eq!(body["data"]["checkpoints"]["overall_result"], "pass");

        let (status, body) = request_json(
            &app,
            "GET",
            &format!("/api/chat/history/{}", session_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["executed"], true);
        let turns = body["data"]["turns"].as_array().unwrap();
        // Greeting, the user message, the verification reply
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1]["role"], "user");

        let image_request = Request::builder()
            .method("GET")
            .uri(format!("/api/chat/image/{}/0", session_id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(image_request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_start_rejects_empty_protocol() {
        let app = api_router(test_state(vec![]));
        let (status, body) = request_json(
            &app,
            "POST",
            "/api/chat/start",
            Some(json!({"protocol_name": "x.py", "protocol_text": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_message_to_unknown_session_is_404() {
        let app = api_router(test_state(vec![]));
        let (status, body) = request_json(
            &app,
            "POST",
            "/api/chat/message",
            Some(json!({
                "session_id": "00000000-0000-0000-0000-000000000000",
                "message": "hello"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_experiment_roundtrip() {
        let app = api_router(test_state(vec![]));

        let (status, body) = request_json(
            &app,
            "POST",
            "/api/experiments",
            Some(json!({"scenario": "gradual", "seed": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let experiment_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["timepoints"].as_array().unwrap().len(), 6);
        let first_well = &body["data"]["timepoints"][0]["wells"][0];
        assert_eq!(first_well["well_id"], "A1");
        assert!(first_well["statistical"]["label"].is_string());
        assert!(first_well["llm"]["label"].is_string());

        let (status, body) = request_json(
            &app,
            "GET",
            &format!("/api/experiments/{}", experiment_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], experiment_id.as_str());

        let (status, _) = request_json(
            &app,
            "GET",
            "/api/experiments/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_experiment_invalid_config_is_400() {
        let app = api_router(test_state(vec![]));
        let (status, body) = request_json(
            &app,
            "POST",
            "/api/experiments",
            Some(json!({"num_timepoints": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
