//! REST API for the cortex
//!
//! Thin HTTP surface over [`Cortex`]: submit tasks, read and search memory,
//! list the playbook.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Cortex;
use crate::memory::MemoryFilter;
use crate::models::Task;

const DEFAULT_RECENT_LIMIT: usize = 20;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskRequest {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub cortex: Arc<Cortex>,
}

/// =============================
/// Health
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let memory = state.cortex.memory();
    Json(serde_json::json!({
        "status": "healthy",
        "memory_backend": memory.active_backend().await,
        "memory_healthy": memory.health().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Tasks
/// =============================

async fn submit_task(
    State(state): State<ApiState>,
    Json(req): Json<TaskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Task text is empty".into())),
        );
    }

    let task = Task::new(req.text).with_source(req.source.unwrap_or_else(|| "api".to_string()));
    info!(task_id = %task.task_id, "Received task");

    // A failed handler is still a processed task; report it in the body.
    let response = state.cortex.process(task).await;
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// =============================
/// Memory
/// =============================

async fn recent_memory(
    State(state): State<ApiState>,
    Query(query): Query<RecentQuery>,
) -> (StatusCode, Json<ApiResponse>) {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match state.cortex.memory().recent(limit).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("Memory read failed: {}", e))),
        ),
    }
}

async fn search_memory(
    State(state): State<ApiState>,
    Json(filter): Json<MemoryFilter>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.cortex.memory().search(&filter).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("Memory search failed: {}", e))),
        ),
    }
}

async fn reinitialize_memory(State(state): State<ApiState>) -> Json<ApiResponse> {
    let backend = state.cortex.memory().reinitialize().await;
    Json(ApiResponse::success(serde_json::json!({ "memory_backend": backend })))
}

/// =============================
/// Playbook
/// =============================

async fn list_strategies(State(state): State<ApiState>) -> Json<ApiResponse> {
    let strategies: Vec<serde_json::Value> = state
        .cortex
        .playbook()
        .list()
        .into_iter()
        .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
        .collect();
    Json(ApiResponse::success(strategies))
}

/// =============================
/// Router
/// =============================

pub fn create_router(cortex: Arc<Cortex>) -> Router {
    let state = ApiState { cortex };

    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", post(submit_task))
        .route("/api/memory/recent", get(recent_memory))
        .route("/api/memory/search", post(search_memory))
        .route("/api/memory/reinitialize", post(reinitialize_memory))
        .route("/api/strategies", get(list_strategies))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    cortex: Arc<Cortex>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(cortex);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::bootstrap;
    use crate::classifier::{CompletionRequest, StructuredCompletion};
    use crate::config::AgentConfig;
    use crate::memory::{LocalFileMemory, MemoryAdapter};
    use crate::models::RecordKind;
    use crate::tools::CapabilityRegistry;
    use serde_json::{json, Value};

    struct Greeting;

    #[async_trait::async_trait]
    impl StructuredCompletion for Greeting {
        async fn complete(&self, _request: &CompletionRequest) -> crate::Result<Value> {
            Ok(json!({
                "domain_name": "FOUNDATION",
                "reasoning": "greeting",
                "task_parameters": "hi"
            }))
        }
    }

    async fn state() -> ApiState {
        let memory =
            MemoryAdapter::initialize(5, None, Arc::new(LocalFileMemory::in_memory())).await;
        let cortex = bootstrap(
            &AgentConfig::default(),
            Arc::new(Greeting),
            Arc::new(CapabilityRegistry::new()),
            Arc::new(memory),
        )
        .unwrap();
        ApiState {
            cortex: Arc::new(cortex),
        }
    }

    #[tokio::test]
    async fn test_submit_task_and_read_memory() {
        let state = state().await;

        let (status, Json(body)) = submit_task(
            State(state.clone()),
            Json(TaskRequest {
                text: "hi".into(),
                source: None,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        let data = body.data.unwrap();
        assert_eq!(data["domain"], "FOUNDATION");
        assert_eq!(data["status"], "success");

        let (_, Json(recent)) =
            recent_memory(State(state.clone()), Query(RecentQuery { limit: Some(10) })).await;
        assert_eq!(recent.data.unwrap().as_array().unwrap().len(), 2);

        let (_, Json(found)) =
            search_memory(State(state), Json(MemoryFilter::kind(RecordKind::User))).await;
        let found = found.data.unwrap();
        assert_eq!(found[0]["source"], "api");
    }

    #[tokio::test]
    async fn test_empty_task_rejected() {
        let (status, Json(body)) = submit_task(
            State(state().await),
            Json(TaskRequest {
                text: "   ".into(),
                source: None,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_list_strategies() {
        let Json(body) = list_strategies(State(state().await)).await;
        assert_eq!(body.data.unwrap()[0]["name"], "second_day_play");
    }
}
