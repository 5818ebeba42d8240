//! HR Buddy HTTP 服务
//!
//! 入口：初始化日志、加载配置、构建聊天服务并启动 axum；Ctrl+C / SIGTERM 时优雅关闭。

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hr_buddy::{
    agent::ChatService,
    config::load_config,
    core::ShutdownManager,
    observability,
    server::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let service = ChatService::from_config(&cfg, shutdown.clone()).context("Failed to create chat service")?;
    let state = AppState {
        service: Arc::new(service),
        app_name: cfg.app.name.clone(),
    };
    let app = router(state, &cfg.server);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid server host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "HR Buddy API listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait_for_shutdown().await })
        .await
        .context("Server error")?;

    tracing::info!("HR Buddy API stopped");
    Ok(())
}
