// 目录扫描器
//
// 基于 walkdir 遍历目录树，深度超过上限时整个扫描失败

use super::error::BatchError;
use crate::filesystem::PathGuard;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// 描述文件扫描器
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    guard: PathGuard,
    max_depth: usize,
    /// 小写扩展名（不带点）
    extensions: Vec<String>,
}

impl DirectoryScanner {
    pub fn new(guard: PathGuard, max_depth: usize, extensions: &[String]) -> Self {
        Self {
            guard,
            max_depth,
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 扫描目录下的全部描述文件
    ///
    /// 根目录深度为 0；每个目录内先列文件再进入子目录，同类按文件名排序
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, BatchError> {
        if !root.is_dir() {
            return Err(BatchError::DirectoryNotFound(
                root.to_string_lossy().to_string(),
            ));
        }

        let guard = &self.guard;
        let walker = WalkDir::new(root)
            .follow_links(guard.follows_symlinks())
            // 多遍历一层，用于发现超出上限的目录
            .max_depth(self.max_depth.saturating_add(1))
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !Self::should_skip(guard, entry));

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let message = e.to_string();
                    return Err(BatchError::Io {
                        path: root.to_string_lossy().to_string(),
                        source: e
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other(message)),
                    });
                }
                Err(e) => {
                    warn!("跳过无法访问的条目: {}", e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if entry.depth() > self.max_depth {
                    return Err(BatchError::ScanDepthExceeded {
                        path: entry.path().to_string_lossy().to_string(),
                        max_depth: self.max_depth,
                    });
                }
            } else if file_type.is_file() && self.matches_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!("扫描完成: {:?}, 共 {} 个文件", root, files.len());
        Ok(files)
    }

    /// 隐藏条目与不跟随的符号链接
    fn should_skip(guard: &PathGuard, entry: &DirEntry) -> bool {
        guard.is_hidden(entry.path()) || guard.should_skip_symlink(entry.path())
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}
