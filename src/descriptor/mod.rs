//! 描述文件读写能力
//!
//! 批量编辑核心只依赖 [`DescriptorIo`] 这一读写接口，不关心磁盘格式。
//! 默认实现 [`NfoDescriptorIo`] 处理 Kodi/Jellyfin 风格的 XML `.nfo` 文件

mod nfo;

pub use nfo::NfoDescriptorIo;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 字段映射（字段名 -> 字段值）
pub type FieldMap = BTreeMap<String, String>;

/// 描述文件读写错误
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// 文件不存在
    #[error("文件不存在: {0}")]
    NotFound(PathBuf),

    /// 文件内容无法解析
    #[error("解析失败: {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// 读写 IO 错误
    #[error("读写失败: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 读写能力整体不可用（任务级错误，终止整个批次）
    #[error("描述文件读写不可用: {0}")]
    Unavailable(String),
}

impl DescriptorError {
    /// 是否为任务级错误
    ///
    /// 单个文件的错误只记录到任务错误列表，任务级错误会终止剩余处理
    pub fn is_fatal(&self) -> bool {
        matches!(self, DescriptorError::Unavailable(_))
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            DescriptorError::NotFound(path.to_path_buf())
        } else {
            DescriptorError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// 描述文件读写接口
///
/// 实现必须可跨线程共享：预览在请求线程上调用，应用阶段在后台线程上调用
pub trait DescriptorIo: Send + Sync {
    /// 读取文件中的全部字段
    fn read(&self, path: &Path) -> Result<FieldMap, DescriptorError>;

    /// 将字段写回文件
    fn write(&self, path: &Path, fields: &FieldMap) -> Result<(), DescriptorError>;
}
