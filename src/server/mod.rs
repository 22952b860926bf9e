//! HTTP API
//!
//! Task CRUD, the chunk trigger, and the planning routes, served with axum.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::pipeline::ChunkPipeline;
use crate::planning::PlanningAssistant;
use crate::store::SharedStore;

pub use error::{ApiError, status_for};

/// Shared state handed to every handler
pub struct AppState {
    pub store: SharedStore,
    pub pipeline: ChunkPipeline,
    pub planner: PlanningAssistant,
    /// Include error text in response bodies
    pub expose_error_details: bool,
}

/// Build the router with CORS and request logging
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/tasks", post(handlers::create_task).get(handlers::list_tasks))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/chunk", post(handlers::chunk))
        .route("/slots/score", post(handlers::score_slots))
        .route("/schedule/rebalance", post(handlers::rebalance))
        .route("/schedule/simulate", post(handlers::simulate))
        .route("/schedule/summary", post(handlers::summary))
        .route("/analytics/insights", post(handlers::insights))
        .layer(middleware::from_fn(log_request))
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    log::info!("Incoming request: {} {}", request.method(), request.uri());
    next.run(request).await
}

/// Any origin when `cors_origins` is empty, otherwise only the listed ones
fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let mut parsed = Vec::new();
    for origin in cors_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => parsed.push(value),
            Err(e) => log::warn!("Ignoring invalid CORS origin '{}': {}", origin, e),
        }
    }
    layer.allow_origin(parsed)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, config: &ServerConfig) -> Result<()> {
    let app = create_router(state, &config.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| crate::error::ChunkdError::Configuration(format!("invalid listen address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
