// Web服务器模块

pub mod handlers;
pub mod state;

pub use state::AppState;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
}

// 健康检查处理器
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "nfo-batch-editor".to_string(),
    })
}

/// 根据配置构建 CORS 层
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略无效的 CORS 源: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// 构建完整路由
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    // API 路由
    let api_routes = Router::new()
        .route("/batch/preview", post(handlers::preview_batch))
        .route("/batch/apply", post(handlers::apply_batch))
        .route("/batch/status/:task_id", get(handlers::get_batch_status))
        .route("/batch/tasks", get(handlers::list_batch_tasks))
        .route("/batch/tasks/:task_id", delete(handlers::delete_batch_task))
        .route("/batch/cleanup", post(handlers::cleanup_batch_tasks))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
