// 批量修改执行器

use super::editor::FieldEdit;
use super::error::BatchError;
use super::store::TaskStore;
use super::task::{ApplyPlan, TaskStatus};
use super::types::BatchApplyResponse;
use crate::descriptor::{DescriptorError, DescriptorIo};
use std::path::Path;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

/// 执行器
#[derive(Clone)]
pub struct BatchProcessor {
    store: TaskStore,
    io: Arc<dyn DescriptorIo>,
}

/// 已启动的执行句柄
pub struct ApplyHandle {
    pub response: BatchApplyResponse,
    join: JoinHandle<()>,
}

impl ApplyHandle {
    /// 等待后台处理结束
    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}

impl BatchProcessor {
    pub fn new(store: TaskStore, io: Arc<dyn DescriptorIo>) -> Self {
        Self { store, io }
    }

    /// 开始执行任务，立即返回，文件处理在阻塞线程池中进行
    pub fn apply(&self, task_id: &str) -> Result<ApplyHandle, BatchError> {
        let plan = self.store.begin_run(task_id)?;
        info!(
            "开始批量修改: task_id={}, 字段={}, 模式={}, 文件数={}",
            plan.task_id,
            plan.edit.field,
            plan.edit.mode,
            plan.target_files.len()
        );

        let response = BatchApplyResponse {
            task_id: plan.task_id.clone(),
            status: TaskStatus::Running,
        };

        let store = self.store.clone();
        let io = Arc::clone(&self.io);
        let join = tokio::task::spawn_blocking(move || run_plan(&store, io.as_ref(), plan));

        Ok(ApplyHandle { response, join })
    }
}

/// 逐个处理目标文件
fn run_plan(store: &TaskStore, io: &dyn DescriptorIo, plan: ApplyPlan) {
    let task_id = plan.task_id.as_str();

    for path in &plan.target_files {
        if !plan.directory.is_dir() {
            let message = format!("目标目录已不存在: {}", plan.directory.display());
            error!("批量修改中止: task_id={}, {}", task_id, message);
            store.mark_failed(task_id, message);
            return;
        }

        let recorded = match apply_to_file(io, &plan.edit, path) {
            Ok(()) => store.record_success(task_id),
            Err(e) if e.is_fatal() => {
                error!("批量修改中止: task_id={}, 错误: {}", task_id, e);
                store.mark_failed(task_id, e.to_string());
                return;
            }
            Err(e) => {
                warn!("文件修改失败: {:?}, 错误: {}", path, e);
                store.record_failure(task_id, format!("{}: {}", path.display(), e))
            }
        };

        if !recorded {
            // 任务已被删除
            info!("任务已不存在，停止处理: {}", task_id);
            return;
        }
    }

    if store.mark_completed(task_id) {
        if let Some(snapshot) = store.get(task_id) {
            info!(
                "批量修改完成: task_id={}, 成功={}, 失败={}",
                task_id, snapshot.success_count, snapshot.failed_count
            );
        }
    }
}

fn apply_to_file(
    io: &dyn DescriptorIo,
    edit: &FieldEdit,
    path: &Path,
) -> Result<(), DescriptorError> {
    let mut fields = io.read(path)?;
    edit.apply_to(&mut fields);
    io.write(path, &fields)
}
