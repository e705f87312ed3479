use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::features::session::store::SessionStore;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 处理会话存储（按产物字节大小加权的有界缓存）
    pub sessions: SessionStore,
    /// 控制并发图像处理的信号量（限制 CPU 密集型任务数量）
    pub processing_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sessions: SessionStore::new(&config.session),
            processing_semaphore: Arc::new(Semaphore::new(
                config.processing.effective_parallelism(),
            )),
        }
    }
}
