// 批量编辑任务定义

use super::editor::{EditMode, FieldEdit};
use super::error::BatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// 批量任务状态
///
/// 只允许 Pending -> Running -> {Completed, Failed}
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// 已预览，等待确认
    Pending,
    /// 正在写入
    Running,
    /// 全部文件处理完毕（可能有部分文件失败）
    Completed,
    /// 任务级错误，剩余文件未处理
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// 是否允许转换到目标状态
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 批量任务（任务存储内部持有的可变记录）
#[derive(Debug, Clone)]
pub struct BatchTask {
    id: String,
    status: TaskStatus,
    total_files: usize,
    processed_files: usize,
    success_count: usize,
    failed_count: usize,
    errors: Vec<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    directory: PathBuf,
    edit: FieldEdit,
    /// 预览时确定的完整文件列表，应用阶段不会重新扫描
    target_files: Vec<PathBuf>,
}

impl BatchTask {
    /// 创建新的待执行任务
    pub fn new(directory: PathBuf, edit: FieldEdit, target_files: Vec<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: TaskStatus::Pending,
            total_files: target_files.len(),
            processed_files: 0,
            success_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            directory,
            edit,
            target_files,
        }
    }

    /// 指定任务 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 指定创建时间
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 标记为执行中，返回执行计划
    pub fn mark_running(&mut self) -> Result<ApplyPlan, BatchError> {
        if !self.status.can_transition_to(TaskStatus::Running) {
            return Err(BatchError::InvalidState {
                task_id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());

        Ok(ApplyPlan {
            task_id: self.id.clone(),
            directory: self.directory.clone(),
            edit: self.edit.clone(),
            target_files: self.target_files.clone(),
        })
    }

    /// 记录单个文件处理成功
    pub fn record_success(&mut self) -> bool {
        if !self.advance_processed() {
            return false;
        }
        self.success_count += 1;
        true
    }

    /// 记录单个文件处理失败
    pub fn record_failure(&mut self, error: String) -> bool {
        if !self.advance_processed() {
            return false;
        }
        self.failed_count += 1;
        self.errors.push(error);
        true
    }

    fn advance_processed(&mut self) -> bool {
        if self.status != TaskStatus::Running || self.processed_files >= self.total_files {
            return false;
        }
        self.processed_files += 1;
        true
    }

    /// 标记全部完成
    pub fn mark_completed(&mut self) -> bool {
        self.finish(TaskStatus::Completed)
    }

    /// 标记任务级失败，错误信息作为最后一条记录
    pub fn mark_failed(&mut self, error: String) -> bool {
        if !self.finish(TaskStatus::Failed) {
            return false;
        }
        self.errors.push(error);
        true
    }

    fn finish(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.finished_at = Some(Utc::now());
        true
    }

    /// 计算进度百分比
    pub fn progress(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.processed_files as f64 / self.total_files as f64 * 100.0
        }
    }

    /// 生成只读快照
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id.clone(),
            status: self.status,
            progress: self.progress(),
            total_files: self.total_files,
            processed_files: self.processed_files,
            success_count: self.success_count,
            failed_count: self.failed_count,
            errors: self.errors.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            directory: self.directory.to_string_lossy().to_string(),
            field: self.edit.field.clone(),
            value: self.edit.value.clone(),
            mode: self.edit.mode,
        }
    }
}

/// 任务只读快照（对外返回，不包含目标文件列表）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub total_files: usize,
    pub processed_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub directory: String,
    pub field: String,
    pub value: String,
    pub mode: EditMode,
}

/// 应用阶段的执行计划（任务定义的副本）
#[derive(Debug, Clone)]
pub struct ApplyPlan {
    pub task_id: String,
    pub directory: PathBuf,
    pub edit: FieldEdit,
    pub target_files: Vec<PathBuf>,
}
