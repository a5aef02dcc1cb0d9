//! Event endpoints.
//!
//! The HTTP layer is a thin mapping: each route hands the raw JSON
//! envelope to its handler and translates the terminal
//! [`ControllerResult`] into a status code and JSON body.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::Value;

use capstan_advisor::Advisor;
use capstan_cluster::Cluster;
use capstan_controller::{DeployHandler, RollbackHandler};
use capstan_core::ControllerResult;
use capstan_notify::Notifier;
use capstan_pipeline::PipelineStatus;

/// Handlers shared by the event routes.
pub struct AppState<P, C, A, N> {
    pub deploy: DeployHandler<P, C, N>,
    pub rollback: RollbackHandler<P, A, N>,
}

/// Build the daemon router.
pub fn build_router<P, C, A, N>(
    deploy: DeployHandler<P, C, N>,
    rollback: RollbackHandler<P, A, N>,
) -> Router
where
    P: PipelineStatus + Send + Sync + 'static,
    C: Cluster + Send + Sync + 'static,
    A: Advisor + Send + Sync + 'static,
    N: Notifier + Send + Sync + 'static,
{
    let state = Arc::new(AppState { deploy, rollback });

    Router::new()
        .route("/events/pipeline", post(pipeline_event::<P, C, A, N>))
        .route("/events/alarm", post(alarm_event::<P, C, A, N>))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// POST /events/pipeline
async fn pipeline_event<P, C, A, N>(
    State(state): State<Arc<AppState<P, C, A, N>>>,
    Json(event): Json<Value>,
) -> Response
where
    P: PipelineStatus + Send + Sync,
    C: Cluster + Send + Sync,
    A: Advisor + Send + Sync,
    N: Notifier + Send + Sync,
{
    to_response(state.deploy.handle(&event).await)
}

/// POST /events/alarm
async fn alarm_event<P, C, A, N>(
    State(state): State<Arc<AppState<P, C, A, N>>>,
    Json(event): Json<Value>,
) -> Response
where
    P: PipelineStatus + Send + Sync,
    C: Cluster + Send + Sync,
    A: Advisor + Send + Sync,
    N: Notifier + Send + Sync,
{
    to_response(state.rollback.handle(&event).await)
}

/// GET /healthz
async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn to_response(result: ControllerResult) -> Response {
    let status =
        StatusCode::from_u16(result.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result.body())).into_response()
}
