// 批量编辑错误类型

use super::task::TaskStatus;
use thiserror::Error;

/// 业务错误码
pub mod error_codes {
    /// 目录不存在
    pub const DIRECTORY_NOT_FOUND: i32 = 2001;
    /// 任务不存在
    pub const TASK_NOT_FOUND: i32 = 2002;
    /// 超过最大扫描深度
    pub const SCAN_DEPTH_EXCEEDED: i32 = 2003;
    /// 任务状态不允许该操作
    pub const INVALID_STATE: i32 = 2004;
    /// 字段名无效
    pub const INVALID_FIELD: i32 = 2005;
    /// 路径不允许访问
    pub const PATH_NOT_ALLOWED: i32 = 2006;
    /// 未确认执行
    pub const NOT_CONFIRMED: i32 = 2007;
    /// 文件系统错误
    pub const IO_ERROR: i32 = 2008;
}

/// 批量编辑错误
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("目录不存在: {0}")]
    DirectoryNotFound(String),

    #[error("任务不存在: {0}")]
    TaskNotFound(String),

    #[error("超过最大扫描深度 {max_depth}: {path}")]
    ScanDepthExceeded { path: String, max_depth: usize },

    #[error("任务 {task_id} 当前状态为 {status}，不能执行")]
    InvalidState { task_id: String, status: TaskStatus },

    #[error("字段名无效: {0:?}")]
    InvalidField(String),

    #[error("路径不允许访问: {0}")]
    PathNotAllowed(String),

    #[error("批量修改未确认")]
    NotConfirmed,

    #[error("读取目录失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl BatchError {
    /// 对应的业务错误码
    pub fn code(&self) -> i32 {
        match self {
            BatchError::DirectoryNotFound(_) => error_codes::DIRECTORY_NOT_FOUND,
            BatchError::TaskNotFound(_) => error_codes::TASK_NOT_FOUND,
            BatchError::ScanDepthExceeded { .. } => error_codes::SCAN_DEPTH_EXCEEDED,
            BatchError::InvalidState { .. } => error_codes::INVALID_STATE,
            BatchError::InvalidField(_) => error_codes::INVALID_FIELD,
            BatchError::PathNotAllowed(_) => error_codes::PATH_NOT_ALLOWED,
            BatchError::NotConfirmed => error_codes::NOT_CONFIRMED,
            BatchError::Io { .. } => error_codes::IO_ERROR,
        }
    }

    /// 目录或任务不存在
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BatchError::DirectoryNotFound(_) | BatchError::TaskNotFound(_)
        )
    }
}
