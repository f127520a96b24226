// 批量修改预览

use super::editor::FieldEdit;
use super::error::BatchError;
use super::scanner::DirectoryScanner;
use super::store::TaskStore;
use super::task::BatchTask;
use super::types::{BatchPreviewRequest, BatchPreviewResponse, SampleFile};
use crate::descriptor::DescriptorIo;
use crate::filesystem::PathGuard;
use std::sync::Arc;
use tracing::{info, warn};

/// 预览引擎
///
/// 扫描目录、计算每个文件的新值并登记待执行任务，不修改任何文件
#[derive(Clone)]
pub struct PreviewEngine {
    guard: PathGuard,
    scanner: DirectoryScanner,
    io: Arc<dyn DescriptorIo>,
    store: TaskStore,
    sample_size: usize,
    separator: String,
}

impl PreviewEngine {
    pub fn new(
        guard: PathGuard,
        scanner: DirectoryScanner,
        io: Arc<dyn DescriptorIo>,
        store: TaskStore,
        sample_size: usize,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            guard,
            scanner,
            io,
            store,
            sample_size,
            separator: separator.into(),
        }
    }

    /// 生成预览并登记任务
    pub fn preview(
        &self,
        request: &BatchPreviewRequest,
    ) -> Result<BatchPreviewResponse, BatchError> {
        let edit = FieldEdit::new(
            request.field.as_str(),
            request.value.as_str(),
            request.mode,
            self.separator.as_str(),
        )?;
        let directory = self.guard.normalize_dir(&request.directory)?;
        let files = self.scanner.scan(&directory)?;

        let mut sample_files = Vec::with_capacity(self.sample_size.min(files.len()));
        let mut unreadable_files = 0;

        for path in &files {
            let sample = match self.io.read(path) {
                Ok(mut fields) => {
                    let (old_value, new_value) = edit.apply_to(&mut fields);
                    SampleFile {
                        path: path.to_string_lossy().to_string(),
                        old_value,
                        new_value,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("预览读取失败: {:?}, 错误: {}", path, e);
                    unreadable_files += 1;
                    SampleFile {
                        path: path.to_string_lossy().to_string(),
                        old_value: None,
                        new_value: edit.new_value(None),
                        error: Some(e.to_string()),
                    }
                }
            };

            if sample_files.len() < self.sample_size {
                sample_files.push(sample);
            }
        }

        let task = BatchTask::new(directory.clone(), edit, files);
        let task_id = task.id().to_string();
        let total_files = task.snapshot().total_files;
        self.store.add(task);

        info!(
            "批量预览完成: task_id={}, 目录={:?}, 字段={}, 文件数={}, 无法读取={}",
            task_id, directory, request.field, total_files, unreadable_files
        );

        Ok(BatchPreviewResponse {
            task_id,
            total_files,
            sample_files,
            unreadable_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::editor::EditMode;
    use crate::batch::task::TaskStatus;
    use crate::descriptor::NfoDescriptorIo;
    use crate::filesystem::FilesystemConfig;
    use std::fs;
    use std::path::Path;

    fn engine(store: &TaskStore, sample_size: usize) -> PreviewEngine {
        let guard = PathGuard::new(FilesystemConfig::default());
        let scanner = DirectoryScanner::new(guard.clone(), 50, &["nfo".to_string()]);
        PreviewEngine::new(
            guard,
            scanner,
            Arc::new(NfoDescriptorIo::new().unwrap()),
            store.clone(),
            sample_size,
            ", ",
        )
    }

    fn request(dir: &Path, field: &str, value: &str, mode: EditMode) -> BatchPreviewRequest {
        BatchPreviewRequest {
            directory: dir.to_string_lossy().to_string(),
            field: field.to_string(),
            value: value.to_string(),
            mode,
        }
    }

    fn write_movie(path: &Path, title: &str, studio: &str) {
        fs::write(
            path,
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<movie>\n    <title>{}</title>\n    <studio>{}</studio>\n</movie>\n",
                title, studio
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_preview_two_files() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(&dir.path().join("movie1.nfo"), "Movie 1", "Old Studio");
        write_movie(&dir.path().join("movie2.nfo"), "Movie 2", "Old Studio");

        let store = TaskStore::new(1800, false);
        let response = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "Disney", EditMode::Overwrite))
            .unwrap();

        assert_eq!(response.total_files, 2);
        assert_eq!(response.sample_files.len(), 2);
        assert_eq!(response.unreadable_files, 0);
        for sample in &response.sample_files {
            assert_eq!(sample.old_value.as_deref(), Some("Old Studio"));
            assert_eq!(sample.new_value, "Disney");
        }

        let snapshot = store.get(&response.task_id).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!(snapshot.total_files, 2);

        // 预览不修改文件
        let content = fs::read_to_string(dir.path().join("movie1.nfo")).unwrap();
        assert!(content.contains("<studio>Old Studio</studio>"));
    }

    #[test]
    fn test_sample_capped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            write_movie(
                &dir.path().join(format!("movie{}.nfo", i)),
                &format!("Movie {}", i),
                "A",
            );
        }

        let store = TaskStore::new(1800, false);
        let response = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "B", EditMode::Overwrite))
            .unwrap();

        assert_eq!(response.total_files, 8);
        assert_eq!(response.sample_files.len(), 5);
        assert!(response.sample_files[0].path.ends_with("movie0.nfo"));
    }

    #[test]
    fn test_append_preview() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(&dir.path().join("a.nfo"), "A", "Pixar");
        fs::write(dir.path().join("b.nfo"), "<movie><title>B</title></movie>").unwrap();

        let store = TaskStore::new(1800, false);
        let response = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "Disney", EditMode::Append))
            .unwrap();

        assert_eq!(response.sample_files[0].new_value, "Pixar, Disney");
        assert_eq!(response.sample_files[1].old_value, None);
        assert_eq!(response.sample_files[1].new_value, "Disney");
    }

    #[test]
    fn test_unreadable_file_still_targeted() {
        let dir = tempfile::tempdir().unwrap();
        write_movie(&dir.path().join("a.nfo"), "A", "X");
        fs::write(dir.path().join("b.nfo"), "not xml at all").unwrap();

        let store = TaskStore::new(1800, false);
        let response = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "Y", EditMode::Overwrite))
            .unwrap();

        assert_eq!(response.total_files, 2);
        assert_eq!(response.unreadable_files, 1);
        assert!(response.sample_files[1].error.is_some());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(1800, false);
        let err = engine(&store, 5)
            .preview(&request(
                &dir.path().join("missing"),
                "studio",
                "Disney",
                EditMode::Overwrite,
            ))
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[test]
    fn test_depth_exceeded_creates_no_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut current = dir.path().to_path_buf();
        for i in 0..60 {
            current = current.join(format!("level_{}", i));
        }
        fs::create_dir_all(&current).unwrap();
        write_movie(&current.join("movie.nfo"), "Deep", "X");

        let store = TaskStore::new(1800, false);
        let err = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "Disney", EditMode::Overwrite))
            .unwrap_err();

        assert!(matches!(err, BatchError::ScanDepthExceeded { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(1800, false);
        let err = engine(&store, 5)
            .preview(&request(dir.path(), "", "Disney", EditMode::Overwrite))
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidField(_)));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(1800, false);
        let response = engine(&store, 5)
            .preview(&request(dir.path(), "studio", "Disney", EditMode::Overwrite))
            .unwrap();

        assert_eq!(response.total_files, 0);
        assert!(response.sample_files.is_empty());
        assert_eq!(store.get(&response.task_id).unwrap().progress, 0.0);
    }
}
