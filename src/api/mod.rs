//! HTTP API.
//!
//! - `GET  /api/health`       liveness
//! - `POST /api/runs`         run to completion, return the document
//! - `POST /api/runs/stream`  same run, streamed as SSE status events

mod runs;
pub mod types;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agents::Roles;
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::Orchestrator;

use types::HealthResponse;

/// Shared state for all handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    run_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, max_concurrent_runs: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            run_slots: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    /// Wait for a free run slot.
    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        Arc::clone(&self.run_slots)
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Cancelled)
    }
}

/// Build the router over prepared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/runs", post(runs::create_run))
        .route("/api/runs/stream", post(runs::stream_run))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire production roles and serve until the process is stopped.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let roles = Roles::from_config(&config)?;
    let orchestrator = Orchestrator::new(roles, config.pipeline.clone());
    let state = Arc::new(AppState::new(orchestrator, config.max_concurrent_runs));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        max_iterations = config.pipeline.max_iterations,
        search_enabled = config.pipeline.search_enabled,
        "Listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
