// 批量任务存储
//
// 进程内唯一的任务表，所有读写通过同一把锁串行化

use super::error::BatchError;
use super::task::{ApplyPlan, BatchTask, TaskSnapshot, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 任务存储（可廉价克隆的共享句柄）
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Arc<Mutex<HashMap<String, BatchTask>>>,
    ttl: Duration,
    /// 是否清理执行中的过期任务
    evict_running: bool,
}

impl TaskStore {
    pub fn new(ttl_secs: u64, evict_running: bool) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs as i64),
            evict_running,
        }
    }

    /// 添加任务（同 ID 覆盖）
    pub fn add(&self, task: BatchTask) {
        let id = task.id().to_string();
        self.tasks.lock().insert(id.clone(), task);
        debug!("任务已登记: {}", id);
    }

    /// 获取任务快照
    pub fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.tasks.lock().get(task_id).map(BatchTask::snapshot)
    }

    /// 删除任务
    pub fn delete(&self, task_id: &str) -> bool {
        let removed = self.tasks.lock().remove(task_id).is_some();
        if removed {
            info!("任务已删除: {}", task_id);
        }
        removed
    }

    /// 所有任务快照（按创建时间排序）
    pub fn list_all(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<_> = self
            .tasks
            .lock()
            .values()
            .map(BatchTask::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// 清理过期任务，返回清理数量
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    /// 以指定时间为准清理过期任务
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|_, task| {
            if !self.evict_running && task.status() == TaskStatus::Running {
                return true;
            }
            now - task.created_at() < self.ttl
        });
        before - tasks.len()
    }

    /// 启动执行：PENDING -> RUNNING 的原子检查与设置
    pub fn begin_run(&self, task_id: &str) -> Result<ApplyPlan, BatchError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| BatchError::TaskNotFound(task_id.to_string()))?;
        task.mark_running()
    }

    /// 记录单个文件成功，任务已不存在时返回 false
    pub fn record_success(&self, task_id: &str) -> bool {
        self.tasks
            .lock()
            .get_mut(task_id)
            .map(BatchTask::record_success)
            .unwrap_or(false)
    }

    /// 记录单个文件失败，任务已不存在时返回 false
    pub fn record_failure(&self, task_id: &str, error: String) -> bool {
        self.tasks
            .lock()
            .get_mut(task_id)
            .map(|task| task.record_failure(error))
            .unwrap_or(false)
    }

    pub fn mark_completed(&self, task_id: &str) -> bool {
        self.tasks
            .lock()
            .get_mut(task_id)
            .map(BatchTask::mark_completed)
            .unwrap_or(false)
    }

    pub fn mark_failed(&self, task_id: &str, error: String) -> bool {
        self.tasks
            .lock()
            .get_mut(task_id)
            .map(|task| task.mark_failed(error))
            .unwrap_or(false)
    }
}

/// 启动后台过期清理循环，令牌取消后退出
pub fn spawn_cleanup_loop(
    store: TaskStore,
    interval: std::time::Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.cleanup_expired();
                    if removed > 0 {
                        info!("清理过期任务 {} 个，剩余 {} 个", removed, store.len());
                    }
                }
                _ = shutdown.cancelled() => {
                    break;
                }
            }
        }

        info!("任务清理循环已退出");
    })
}
