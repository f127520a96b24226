// 应用状态

use crate::batch::{BatchProcessor, DirectoryScanner, PreviewEngine, TaskStore};
use crate::config::AppConfig;
use crate::descriptor::{DescriptorIo, NfoDescriptorIo};
use crate::filesystem::PathGuard;
use std::sync::Arc;

/// 应用全局状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 任务存储
    pub store: TaskStore,
    /// 预览引擎
    pub preview: PreviewEngine,
    /// 执行器
    pub processor: BatchProcessor,
}

impl AppState {
    /// 使用默认 NFO 读写创建应用状态
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let io: Arc<dyn DescriptorIo> = Arc::new(NfoDescriptorIo::new()?);
        Ok(Self::with_io(config, io))
    }

    /// 使用指定的描述文件读写创建应用状态
    pub fn with_io(config: AppConfig, io: Arc<dyn DescriptorIo>) -> Self {
        let batch = &config.batch;
        let store = TaskStore::new(batch.task_ttl_secs, batch.evict_running_tasks);
        let guard = PathGuard::new(config.filesystem.clone());
        let scanner = DirectoryScanner::new(guard.clone(), batch.max_scan_depth, &batch.extensions);
        let preview = PreviewEngine::new(
            guard,
            scanner,
            Arc::clone(&io),
            store.clone(),
            batch.sample_size,
            batch.append_separator.as_str(),
        );
        let processor = BatchProcessor::new(store.clone(), io);

        Self {
            config: Arc::new(config),
            store,
            preview,
            processor,
        }
    }
}
