//! 优雅退出管理模块
//!
//! 提供跨平台的信号处理和优雅退出协调机制，
//! 支持 SIGINT、SIGTERM 信号和 Windows Ctrl+C 处理。

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

/// 优雅退出管理器
///
/// 内部是一个 watch 通道：`None` 表示运行中，`Some(reason)` 表示已触发退出。
/// 只有第一次触发生效，后续触发被忽略。
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownManager {
    /// 创建新的优雅退出管理器
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// 触发优雅退出（只有第一次生效）
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                debug!("重复的退出信号被忽略: {:?}", reason);
                return false;
            }
            info!("触发优雅退出: {:?}", reason);
            *state = Some(reason);
            true
        });
    }

    /// 检查是否正在关闭
    pub fn is_shutting_down(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// 等待退出信号，返回退出原因
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // 发送端持有于 self，不会在此处关闭
            if rx.changed().await.is_err() {
                return ShutdownReason::Application;
            }
        }
    }

    /// 启动信号处理器
    ///
    /// 在 Linux/macOS 上监听 SIGINT 和 SIGTERM，在 Windows 上监听 Ctrl+C。
    pub fn start_signal_handler(&self) -> Result<(), std::io::Error> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;
            let manager = self.clone();

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("接收到SIGINT信号 (Ctrl+C)");
                        manager.trigger_shutdown(ShutdownReason::Interrupt);
                    }
                    _ = sigterm.recv() => {
                        info!("接收到SIGTERM信号");
                        manager.trigger_shutdown(ShutdownReason::Terminate);
                    }
                }
            });
        }

        #[cfg(windows)]
        {
            let manager = self.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("接收到Ctrl+C信号");
                    manager.trigger_shutdown(ShutdownReason::Interrupt);
                }
            });
        }

        Ok(())
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
