//! 批量编辑模块
//!
//! 预览 -> 确认 -> 后台执行 的两阶段批量字段修改

pub mod editor;
pub mod error;
pub mod preview;
pub mod processor;
pub mod scanner;
pub mod store;
pub mod task;
pub mod types;

pub use editor::{EditMode, FieldEdit};
pub use error::{error_codes, BatchError};
pub use preview::PreviewEngine;
pub use processor::{ApplyHandle, BatchProcessor};
pub use scanner::DirectoryScanner;
pub use store::{spawn_cleanup_loop, TaskStore};
pub use task::{ApplyPlan, BatchTask, TaskSnapshot, TaskStatus};
pub use types::*;
