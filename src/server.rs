//! Server module for Platecheck
//!
//! Loads configuration, wires the LLM provider and tool clients into the
//! orchestrator and simulator, and serves the HTTP API.

use crate::api::{api_router, AppState};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use platecheck_core::{ChatOrchestrator, OrchestratorConfig};
use platecheck_llm::{ChatProvider, GeminiConfig, GeminiProvider};
use platecheck_sim::{ExperimentSimulator, ExperimentStore, ThresholdClassifier, WellJudge};
use platecheck_tools::{CameraClient, CameraSettings, RobotClient, RobotRunner, ToolEndpoint};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// LLM configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Model name; empty means the provider default
    #[serde(default)]
    pub model: String,
}

/// Tool server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub camera_url: String,
    pub robot_url: String,
    #[serde(default = "default_camera_timeout")]
    pub camera_timeout_secs: u64,
    #[serde(default = "default_robot_timeout")]
    pub robot_timeout_secs: u64,
}

fn default_camera_timeout() -> u64 {
    30
}

fn default_robot_timeout() -> u64 {
    120
}

/// Chat configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatConfig {
    /// Phrases that declare the physical setup complete
    #[serde(default)]
    pub readiness_keywords: Vec<String>,
}

/// Embedded default configuration (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Load configuration from files and environment
pub(crate) fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            Environment::with_prefix("PLATECHECK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Build the shared application state from configuration.
fn build_state(config: &AppConfig) -> Result<AppState> {
    let gemini_config = GeminiConfig::from_env().context(
        "No LLM provider configured. Set GOOGLE_API_KEY or GEMINI_API_KEY.",
    )?;
    let provider: Arc<dyn ChatProvider> =
        Arc::new(GeminiProvider::new(gemini_config).context("Failed to build Gemini provider")?);
    info!("LLM provider initialized: {}", provider.name());

    let model = if config.llm.model.is_empty() {
        provider.default_model().to_string()
    } else {
        config.llm.model.clone()
    };

    let camera_endpoint = ToolEndpoint::new(
        "camera",
        config.tools.camera_url.clone(),
        Duration::from_secs(config.tools.camera_timeout_secs),
    )
    .context("Failed to build camera endpoint")?;
    let camera = Arc::new(CameraClient::new(camera_endpoint, CameraSettings::default()));

    let robot_endpoint = ToolEndpoint::new(
        "robot",
        config.tools.robot_url.clone(),
        Duration::from_secs(config.tools.robot_timeout_secs),
    )
    .context("Failed to build robot endpoint")?;
    let robot = Arc::new(RobotClient::new(robot_endpoint));

    let mut orchestrator_config = OrchestratorConfig {
        model: model.clone(),
        ..OrchestratorConfig::default()
    };
    if !config.chat.readiness_keywords.is_empty() {
        orchestrator_config.readiness_keywords = config.chat.readiness_keywords.clone();
    }

    let orchestrator = Arc::new(ChatOrchestrator::new(
        provider.clone(),
        camera,
        robot.clone(),
        orchestrator_config,
    ));
    info!("Orchestrator initialized (model: {})", model);

    let simulator = Arc::new(ExperimentSimulator::new(
        Arc::new(ThresholdClassifier::default()),
        WellJudge::new(provider, model),
    ));

    Ok(AppState {
        orchestrator,
        simulator,
        experiments: Arc::new(ExperimentStore::new()),
        robot,
    })
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Platecheck v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let state = build_state(&config)?;

    // Startup connectivity check, informational only
    match state.robot.ping().await {
        Ok(()) => info!("Robot controller reachable"),
        Err(e) => warn!("Robot controller not reachable at startup: {}", e),
    }

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Platecheck shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8700);
        assert_eq!(config.tools.camera_timeout_secs, 30);
        assert_eq!(config.tools.robot_timeout_secs, 120);
        assert!(config.chat.readiness_keywords.contains(&"done".to_string()));
        assert!(config.chat.readiness_keywords.contains(&"完了".to_string()));
    }
}
