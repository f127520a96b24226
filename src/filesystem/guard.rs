// 路径安全守卫
//
// 提供路径安全检查功能，防止路径穿越攻击

use std::path::{Path, PathBuf};

use crate::batch::BatchError;
use crate::config::FilesystemConfig;

/// 路径安全守卫
#[derive(Debug, Clone)]
pub struct PathGuard {
    config: FilesystemConfig,
}

impl PathGuard {
    /// 创建新的路径守卫
    pub fn new(config: FilesystemConfig) -> Self {
        Self { config }
    }

    /// 检查路径是否在白名单内
    ///
    /// 如果白名单为空，表示允许所有路径
    pub fn is_allowed(&self, path: &Path) -> bool {
        if self.config.allowed_paths.is_empty() {
            return true;
        }

        let canonical = match dunce::canonicalize(path) {
            Ok(p) => p,
            Err(_) => return false,
        };

        self.config.allowed_paths.iter().any(|allowed| {
            dunce::canonicalize(allowed)
                .map(|allowed_canonical| canonical.starts_with(&allowed_canonical))
                .unwrap_or(false)
        })
    }

    /// 规范化目录路径（防止 ../ 穿越）
    ///
    /// 返回规范化后的绝对路径，路径必须存在且为目录。
    /// 穿越序列与白名单外的路径按不允许访问处理
    pub fn normalize_dir(&self, path: &str) -> Result<PathBuf, BatchError> {
        if self.contains_traversal(path) {
            return Err(BatchError::PathNotAllowed(path.to_string()));
        }

        let canonical = dunce::canonicalize(path)
            .map_err(|_| BatchError::DirectoryNotFound(path.to_string()))?;

        if !self.is_allowed(&canonical) {
            return Err(BatchError::PathNotAllowed(path.to_string()));
        }

        // 文件路径同样视为目录不存在
        if !canonical.is_dir() {
            return Err(BatchError::DirectoryNotFound(path.to_string()));
        }

        Ok(canonical)
    }

    /// 检查是否为隐藏文件
    pub fn is_hidden(&self, path: &Path) -> bool {
        if self.config.show_hidden {
            return false;
        }

        // Unix: 以 . 开头的文件
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                return true;
            }
        }

        // Windows: 检查隐藏属性
        #[cfg(target_os = "windows")]
        {
            use std::os::windows::fs::MetadataExt;
            if let Ok(metadata) = path.metadata() {
                const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
                if metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0 {
                    return true;
                }
            }
        }

        false
    }

    /// 检查是否为符号链接
    pub fn is_symlink(&self, path: &Path) -> bool {
        path.symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// 遍历时是否跟随符号链接
    pub fn follows_symlinks(&self) -> bool {
        self.config.follow_symlinks
    }

    /// 检查是否应该跳过符号链接
    pub fn should_skip_symlink(&self, path: &Path) -> bool {
        if self.config.follow_symlinks {
            return false;
        }
        self.is_symlink(path)
    }

    /// 检查路径是否包含穿越序列
    fn contains_traversal(&self, path: &str) -> bool {
        let encoded_patterns = [
            "%2e%2e",     // URL 编码
            "%252e%252e", // 双重 URL 编码
        ];

        let path_lower = path.to_lowercase();
        Path::new(&path_lower)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
            || encoded_patterns.iter().any(|p| path_lower.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_detection() {
        let guard = PathGuard::new(FilesystemConfig::default());

        assert!(guard.contains_traversal("../etc/passwd"));
        assert!(guard.contains_traversal("/home/user/../root"));
        assert!(guard.contains_traversal("%2e%2e/etc"));
        assert!(!guard.contains_traversal("/home/user/files"));
        // 目录名中间带两个点不算穿越
        assert!(!guard.contains_traversal("/movies/Mr..Smith"));
    }

    #[test]
    fn test_normalize_dir() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(FilesystemConfig::default());

        let normalized = guard.normalize_dir(dir.path().to_str().unwrap()).unwrap();
        assert!(normalized.is_absolute());

        let missing = dir.path().join("missing");
        let err = guard.normalize_dir(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BatchError::DirectoryNotFound(_)));

        let file = dir.path().join("movie.nfo");
        std::fs::write(&file, "<movie/>").unwrap();
        let err = guard.normalize_dir(file.to_str().unwrap()).unwrap_err();
        assert!(err.is_not_found());

        let err = guard.normalize_dir("../movies").unwrap_err();
        assert!(matches!(err, BatchError::PathNotAllowed(_)));
    }

    #[test]
    fn test_whitelist() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let config = FilesystemConfig {
            allowed_paths: vec![allowed.path().to_string_lossy().to_string()],
            ..Default::default()
        };
        let guard = PathGuard::new(config);

        let inner = allowed.path().join("movies");
        std::fs::create_dir(&inner).unwrap();
        assert!(guard.normalize_dir(inner.to_str().unwrap()).is_ok());

        let err = guard
            .normalize_dir(other.path().to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, BatchError::PathNotAllowed(_)));
    }

    #[test]
    fn test_hidden_files() {
        let guard = PathGuard::new(FilesystemConfig::default());
        assert!(guard.is_hidden(Path::new("/movies/.actors")));
        assert!(!guard.is_hidden(Path::new("movie.nfo")));

        let guard = PathGuard::new(FilesystemConfig {
            show_hidden: true,
            ..Default::default()
        });
        assert!(!guard.is_hidden(Path::new("/movies/.actors")));
    }
}
