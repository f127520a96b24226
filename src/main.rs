use nfo_batch_editor::{
    batch::spawn_cleanup_loop,
    config::{AppConfig, LogConfig, DEFAULT_CONFIG_PATH},
    logging,
    server::build_router,
    AppState,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 预先读取日志配置，在完整配置加载前初始化日志
async fn load_log_config() -> LogConfig {
    if let Ok(content) = tokio::fs::read_to_string(DEFAULT_CONFIG_PATH).await {
        if let Ok(config) = toml::from_str::<toml::Value>(&content) {
            if let Some(log_table) = config.get("log") {
                if let Ok(log_config) = log_table.clone().try_into::<LogConfig>() {
                    return log_config;
                }
            }
        }
    }

    LogConfig::default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_config = load_log_config().await;

    // 必须保持 _log_guard 存活
    let _log_guard = logging::init_logging(&log_config);

    info!("NFO Batch Editor v{} 启动中...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default(DEFAULT_CONFIG_PATH).await;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cleanup_interval = Duration::from_secs(config.batch.cleanup_interval_secs);

    let app_state = AppState::new(config)?;
    info!("应用状态初始化完成");

    // 过期任务清理
    let shutdown = CancellationToken::new();
    let cleanup_handle =
        spawn_cleanup_loop(app_state.store.clone(), cleanup_interval, shutdown.clone());
    info!("任务清理循环已启动，间隔: {:?}", cleanup_interval);

    let app = build_router(app_state);

    info!("服务器启动在: http://{}", addr);
    info!("API 基础路径: http://{}/api/v1", addr);
    info!("健康检查: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("服务器错误: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("收到 Ctrl+C，开始优雅关闭...");
        }
    }

    shutdown.cancel();
    if let Err(e) = cleanup_handle.await {
        tracing::error!("任务清理循环异常退出: {}", e);
    }
    info!("应用已安全退出");

    Ok(())
}
