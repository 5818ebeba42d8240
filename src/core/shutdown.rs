//! 优雅关闭
//!
//! 监听 Ctrl+C / SIGTERM，触发后：HTTP 服务停止接收新连接，
//! 正在进行的编排循环通过子 CancellationToken 在下一个迭代边界退出。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// 关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM 信号
    Signal,
}

/// 关闭信号管理器
#[derive(Clone, Default)]
pub struct ShutdownManager {
    shutdown_token: CancellationToken,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 派生一个请求级取消令牌：关闭时一并取消，单独取消不影响全局
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    pub fn shutdown(&self, reason: ShutdownReason) {
        tracing::info!(?reason, "Shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// 等待关闭信号（传给 axum::serve 的 with_graceful_shutdown）
    pub async fn wait_for_shutdown(&self) {
        self.shutdown_token.cancelled().await;
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_manager_new() {
        let manager = ShutdownManager::new();
        assert!(!manager.is_shutdown());
    }

    #[test]
    fn test_shutdown_cancels_request_tokens() {
        let manager = ShutdownManager::new();
        let token = manager.request_token();
        assert!(!token.is_cancelled());
        manager.shutdown(ShutdownReason::Signal);
        assert!(manager.is_shutdown());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_request_token_cancel_is_local() {
        let manager = ShutdownManager::new();
        let token = manager.request_token();
        token.cancel();
        assert!(!manager.is_shutdown());
    }
}
