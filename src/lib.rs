// NFO Batch Editor Library
// 媒体描述文件（.nfo）批量编辑核心库

// 批量编辑模块
pub mod batch;

// 配置管理模块
pub mod config;

// 描述文件读写模块
pub mod descriptor;

// 本地路径安全检查模块
pub mod filesystem;

// 日志模块
pub mod logging;

// Web服务器模块
pub mod server;

// 导出常用类型
pub use batch::{
    BatchError, BatchProcessor, BatchTask, DirectoryScanner, EditMode, FieldEdit, PreviewEngine,
    TaskSnapshot, TaskStatus, TaskStore,
};
pub use config::AppConfig;
pub use descriptor::{DescriptorError, DescriptorIo, FieldMap, NfoDescriptorIo};
pub use server::AppState;
