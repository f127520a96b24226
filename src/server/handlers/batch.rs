// 批量编辑 API 处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info, warn};

use super::ApiResponse;
use crate::batch::{
    BatchApplyRequest, BatchApplyResponse, BatchError, BatchPreviewRequest, BatchPreviewResponse,
    BatchStatusResponse, CleanupResponse, TaskSnapshot,
};
use crate::server::state::AppState;

impl IntoResponse for BatchError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BatchError::DirectoryNotFound(_) | BatchError::TaskNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BatchError::InvalidState { .. } => StatusCode::CONFLICT,
            BatchError::ScanDepthExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BatchError::InvalidField(_) | BatchError::NotConfirmed => StatusCode::BAD_REQUEST,
            BatchError::PathNotAllowed(_) => StatusCode::FORBIDDEN,
            BatchError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ApiResponse::<()>::error(self.code(), self.to_string()));
        (status, body).into_response()
    }
}

/// 预览批量修改
///
/// POST /api/v1/batch/preview
pub async fn preview_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchPreviewRequest>,
) -> Result<Json<ApiResponse<BatchPreviewResponse>>, BatchError> {
    info!(
        "API: 批量预览: 目录={}, 字段={}, 模式={}",
        req.directory, req.field, req.mode
    );

    let engine = state.preview.clone();
    let directory = req.directory.clone();
    let result = tokio::task::spawn_blocking(move || engine.preview(&req))
        .await
        .map_err(|e| {
            error!("预览线程异常: {}", e);
            BatchError::Io {
                path: directory,
                source: std::io::Error::other(e.to_string()),
            }
        })?;

    match result {
        Ok(response) => Ok(Json(ApiResponse::success(response))),
        Err(e) => {
            warn!("批量预览失败: {}", e);
            Err(e)
        }
    }
}

/// 确认执行批量修改
///
/// POST /api/v1/batch/apply
pub async fn apply_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchApplyRequest>,
) -> Result<Json<ApiResponse<BatchApplyResponse>>, BatchError> {
    info!("API: 执行批量修改: task_id={}", req.task_id);

    if !req.confirmed {
        return Err(BatchError::NotConfirmed);
    }

    // 后台执行，不等待完成
    let handle = state.processor.apply(&req.task_id)?;
    Ok(Json(ApiResponse::success(handle.response)))
}

/// 查询任务状态
///
/// GET /api/v1/batch/status/:task_id
pub async fn get_batch_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<BatchStatusResponse>>, BatchError> {
    let snapshot = state
        .store
        .get(&task_id)
        .ok_or(BatchError::TaskNotFound(task_id))?;
    Ok(Json(ApiResponse::success(BatchStatusResponse::from(&snapshot))))
}

/// 列出所有任务
///
/// GET /api/v1/batch/tasks
pub async fn list_batch_tasks(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<TaskSnapshot>>> {
    Json(ApiResponse::success(state.store.list_all()))
}

/// 删除任务
///
/// DELETE /api/v1/batch/tasks/:task_id
pub async fn delete_batch_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, BatchError> {
    info!("API: 删除批量任务: task_id={}", task_id);

    if state.store.delete(&task_id) {
        Ok(Json(ApiResponse::success(task_id)))
    } else {
        Err(BatchError::TaskNotFound(task_id))
    }
}

/// 手动清理过期任务
///
/// POST /api/v1/batch/cleanup
pub async fn cleanup_batch_tasks(
    State(state): State<AppState>,
) -> Json<ApiResponse<CleanupResponse>> {
    let removed = state.store.cleanup_expired();
    info!("API: 手动清理过期任务: {} 个", removed);
    Json(ApiResponse::success(CleanupResponse { removed }))
}
