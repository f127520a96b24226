// 批量编辑请求/响应类型

use super::editor::EditMode;
use super::task::{TaskSnapshot, TaskStatus};
use serde::{Deserialize, Serialize};

/// 预览请求
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchPreviewRequest {
    /// 目标目录
    pub directory: String,
    /// 要修改的字段名
    pub field: String,
    /// 提交的值
    pub value: String,
    /// 编辑模式，默认覆盖
    #[serde(default)]
    pub mode: EditMode,
}

/// 执行请求
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchApplyRequest {
    pub task_id: String,
    /// 是否已确认
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

/// 预览样本条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleFile {
    pub path: String,
    pub old_value: Option<String>,
    pub new_value: String,
    /// 预览时读取失败的原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPreviewResponse {
    pub task_id: String,
    pub total_files: usize,
    pub sample_files: Vec<SampleFile>,
    /// 预览阶段读取失败的文件数（仍然计入目标文件）
    pub unreadable_files: usize,
}

/// 执行响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchApplyResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

/// 状态查询响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub processed: usize,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl From<&TaskSnapshot> for BatchStatusResponse {
    fn from(snapshot: &TaskSnapshot) -> Self {
        Self {
            task_id: snapshot.task_id.clone(),
            status: snapshot.status,
            progress: snapshot.progress,
            processed: snapshot.processed_files,
            total: snapshot.total_files,
            success: snapshot.success_count,
            failed: snapshot.failed_count,
            errors: snapshot.errors.clone(),
        }
    }
}

/// 清理响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub removed: usize,
}
