//! Experiment API endpoints
//!
//! POST /api/experiments     - Run a simulated experiment
//! GET  /api/experiments/:id - Fetch a stored experiment

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use platecheck_sim::{Experiment, SimulationConfig};
use uuid::Uuid;

use super::{sim_error_status, ApiResponse, AppState};

/// Run a new experiment and store the readout.
async fn create_experiment(
    State(state): State<AppState>,
    Json(config): Json<SimulationConfig>,
) -> (StatusCode, Json<ApiResponse<Experiment>>) {
    match state.simulator.run(config).await {
        Ok(experiment) => {
            state.experiments.insert(experiment.clone()).await;
            (StatusCode::OK, Json(ApiResponse::success(experiment)))
        }
        Err(e) => (sim_error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Fetch a stored experiment.
async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<Experiment>>) {
    match state.experiments.get(id).await {
        Ok(experiment) => (StatusCode::OK, Json(ApiResponse::success(experiment))),
        Err(e) => (sim_error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Create experiment routes.
pub fn experiments_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/experiments", post(create_experiment))
        .route("/api/experiments/:id", get(get_experiment))
        .with_state(state)
}
