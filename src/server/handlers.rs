//! Route handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{NewTask, Task, TaskWithChunks};
use crate::error::ChunkdError;
use crate::pipeline::ChunkRunReport;
use crate::planning::types::{
    InsightsRequest, RebalanceRequest, ScoreRequest, SimulateRequest, SummaryRequest, TextReply,
};
use crate::planning::{Assignment, SimulationDiff, SlotScore};
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::store;

type ApiResult<T> = Result<Json<T>, ApiError>;

impl AppState {
    fn fail(&self, message: &'static str) -> impl Fn(ChunkdError) -> ApiError + '_ {
        move |e| ApiError::new(message, e, self.expose_error_details)
    }

    fn body<T>(&self, message: &'static str, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
        payload
            .map(|Json(body)| body)
            .map_err(|r| ApiError::rejection(message, r, self.expose_error_details))
    }
}

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<Task> {
    const MSG: &str = "Failed to create task";
    let new_task = state.body(MSG, payload)?;
    let task = new_task.into_task().map_err(state.fail(MSG))?;

    store::lock(&state.store)
        .and_then(|mut s| s.create_task(&task))
        .map_err(state.fail(MSG))?;

    log::info!("Created task {} ({} min)", task.id, task.estimate);
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    include_chunks: Option<bool>,
}

/// GET /tasks
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<TaskWithChunks>> {
    let include_chunks = params.include_chunks.unwrap_or(true);
    let tasks = store::lock(&state.store)
        .and_then(|s| s.list_tasks_with_chunks(include_chunks))
        .map_err(state.fail("Failed to fetch tasks"))?;
    Ok(Json(tasks))
}

/// GET /tasks/{id}
pub async fn get_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<TaskWithChunks> {
    const MSG: &str = "Failed to fetch task";
    store::lock(&state.store)
        .and_then(|s| s.get_task_with_chunks(&id))
        .map_err(state.fail(MSG))?
        .map(Json)
        .ok_or_else(|| state.fail(MSG)(ChunkdError::NotFound(format!("task '{}'", id))))
}

/// POST /chunk
pub async fn chunk(State(state): State<Arc<AppState>>) -> ApiResult<ChunkRunReport> {
    let report = state.pipeline.run().await.map_err(state.fail("Failed to chunk tasks"))?;
    Ok(Json(report))
}

/// POST /slots/score
pub async fn score_slots(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Vec<SlotScore>> {
    const MSG: &str = "Failed to score slots";
    let req = state.body(MSG, payload)?;
    let scores = state
        .planner
        .score_slots(&req.slots, &req.chunks)
        .await
        .map_err(state.fail(MSG))?;
    Ok(Json(scores))
}

/// POST /schedule/rebalance
pub async fn rebalance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RebalanceRequest>, JsonRejection>,
) -> ApiResult<Vec<Assignment>> {
    const MSG: &str = "Failed to rebalance schedule";
    let req = state.body(MSG, payload)?;
    let assignments = state
        .planner
        .rebalance(&req.slots, &req.chunks, &req.scores)
        .await
        .map_err(state.fail(MSG))?;
    Ok(Json(assignments))
}

/// POST /schedule/simulate
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<SimulationDiff> {
    const MSG: &str = "Failed to simulate schedule";
    let req = state.body(MSG, payload)?;
    let diff = state
        .planner
        .simulate(&req.slots, &req.chunks, &req.scores, &req.hypothetical_event)
        .await
        .map_err(state.fail(MSG))?;
    Ok(Json(diff))
}

/// POST /schedule/summary
pub async fn summary(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> ApiResult<TextReply> {
    const MSG: &str = "Failed to summarize schedule";
    let req = state.body(MSG, payload)?;
    let text = state
        .planner
        .summarize_day(&req.schedule)
        .await
        .map_err(state.fail(MSG))?;
    Ok(Json(TextReply { text }))
}

/// POST /analytics/insights
pub async fn insights(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InsightsRequest>, JsonRejection>,
) -> ApiResult<TextReply> {
    const MSG: &str = "Failed to generate insights";
    let req = state.body(MSG, payload)?;
    let text = state.planner.insights(&req.stats).await.map_err(state.fail(MSG))?;
    Ok(Json(TextReply { text }))
}
