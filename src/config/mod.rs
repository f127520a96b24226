// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 批量编辑配置
    #[serde(default)]
    pub batch: BatchConfig,
    /// 文件系统配置
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS允许的源
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    18890
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// 批量编辑配置
///
/// 控制目录扫描深度、预览样本数量、任务过期时间以及追加模式的分隔符
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// 最大扫描深度（根目录为 0）
    #[serde(default = "default_max_scan_depth")]
    pub max_scan_depth: usize,
    /// 预览返回的样本文件数
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// 任务过期时间（秒，默认 30 分钟）
    #[serde(default = "default_task_ttl_secs")]
    pub task_ttl_secs: u64,
    /// 过期任务清理间隔（秒）
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// 追加模式的分隔符
    #[serde(default = "default_append_separator")]
    pub append_separator: String,
    /// 描述文件扩展名（不含点，大小写不敏感）
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// 过期清理时是否同时移除运行中的任务
    #[serde(default)]
    pub evict_running_tasks: bool,
}

fn default_max_scan_depth() -> usize {
    50
}

fn default_sample_size() -> usize {
    5
}

fn default_task_ttl_secs() -> u64 {
    1800
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_append_separator() -> String {
    ", ".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["nfo".to_string()]
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_scan_depth: default_max_scan_depth(),
            sample_size: default_sample_size(),
            task_ttl_secs: default_task_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            append_separator: default_append_separator(),
            extensions: default_extensions(),
            evict_running_tasks: false,
        }
    }
}

/// 文件系统配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// 允许访问的路径白名单（空表示允许所有）
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    /// 是否扫描隐藏文件
    #[serde(default)]
    pub show_hidden: bool,
    /// 是否跟随符号链接
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（按天滚动，超出的文件自动删除）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        self.validate().context("保存配置失败")?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {}", path);
        Ok(())
    }

    /// 加载或创建默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                let default_config = Self::default();

                if let Err(e) = default_config.save_to_file(path).await {
                    tracing::error!("保存默认配置失败: {:#}", e);
                }

                default_config
            }
        }
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        let batch = &self.batch;
        if batch.sample_size == 0 {
            anyhow::bail!("batch.sample_size 必须大于 0");
        }
        if batch.task_ttl_secs == 0 {
            anyhow::bail!("batch.task_ttl_secs 必须大于 0");
        }
        if batch.cleanup_interval_secs == 0 {
            anyhow::bail!("batch.cleanup_interval_secs 必须大于 0");
        }
        if batch.extensions.iter().all(|ext| ext.trim().is_empty()) {
            anyhow::bail!("batch.extensions 至少需要一个有效扩展名");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 18890);
        assert_eq!(config.batch.max_scan_depth, 50);
        assert_eq!(config.batch.sample_size, 5);
        assert_eq!(config.batch.task_ttl_secs, 1800);
        assert_eq!(config.batch.append_separator, ", ");
        assert!(!config.batch.evict_running_tasks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.level, "info");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut config = AppConfig::default();
        config.batch.append_separator = " / ".to_string();
        config.save_to_file(path).await.unwrap();

        let loaded = AppConfig::load_from_file(path).await.unwrap();
        assert_eq!(loaded.server.port, config.server.port);
        assert_eq!(loaded.batch.append_separator, " / ");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [batch]
            sample_size = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.batch.sample_size, 3);
        assert_eq!(config.batch.max_scan_depth, 50);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.batch.extensions, vec!["nfo".to_string()]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.batch.sample_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.batch.extensions = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_or_default_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("app.toml");
        let path_str = path.to_str().unwrap();

        let config = AppConfig::load_or_default(path_str).await;
        assert_eq!(config.batch.max_scan_depth, 50);
        assert!(path.exists());
    }
}
