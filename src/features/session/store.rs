use std::time::Duration;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use uuid::Uuid;

use crate::codec::EncodeFormat;
use crate::config::SessionConfig;
use crate::shutdown::ShutdownManager;

/// 处理会话：某个会话 ID 最近一次处理产物的完整描述。
///
/// 后续操作对同一 ID 的写入是整体覆盖而非追加。
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// 最近一次处理产物的字节
    pub buffer: Bytes,
    /// 产物的编码格式
    pub format: EncodeFormat,
    /// 客户端提交的原始文件名，用于派生下载文件名
    pub original_name: String,
    /// 创建/覆盖时间（仅作展示；过期由缓存 TTL 负责）
    pub created_at: DateTime<Utc>,
}

/// 会话存储。
///
/// 有界缓存：容量按 buffer 字节数加权，TTL 自写入起计。
/// 写入（含覆盖）会重置 TTL，符合“多步编辑续期”的预期。
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<String, SessionRecord>,
}

impl SessionStore {
    pub fn new(cfg: &SessionConfig) -> Self {
        let cache = Cache::builder()
            .weigher(|_k, v: &SessionRecord| v.buffer.len().min(u32::MAX as usize) as u32)
            .max_capacity(cfg.max_bytes)
            .time_to_live(cfg.ttl_duration())
            .build();
        Self { cache }
    }

    /// 测试用：直接指定 TTL 与容量
    pub fn with_ttl(ttl: Duration, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_k, v: &SessionRecord| v.buffer.len().min(u32::MAX as usize) as u32)
            .max_capacity(max_bytes)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// 生成新的会话 ID（128 位随机数的 hex 表示，32 字符）
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// 校验客户端提交的会话 ID 形态（32 位 hex）
    pub fn is_valid_id(id: &str) -> bool {
        id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// 写入或覆盖会话
    pub async fn put(&self, id: String, record: SessionRecord) {
        self.cache.insert(id, record).await;
    }

    pub async fn get(&self, id: &str) -> Option<SessionRecord> {
        self.cache.get(id).await
    }

    /// 删除会话，返回是否确实存在
    pub async fn remove(&self, id: &str) -> bool {
        self.cache.remove(id).await.is_some()
    }

    /// 执行缓存的待处理维护（过期回收、容量淘汰）
    pub async fn run_maintenance(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// 当前存活条目数（维护后才准确，仅用于日志/观测）
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// 启动后台维护任务：按固定间隔触发缓存 housekeeping，直到收到退出信号。
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: ShutdownManager) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        store.run_maintenance().await;
                        tracing::debug!("会话维护完成，存活条目: {}", store.entry_count());
                    }
                    _ = shutdown.wait_for_shutdown() => {
                        tracing::debug!("会话维护任务退出");
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionRecord, SessionStore};
    use crate::codec::EncodeFormat;
    use axum::body::Bytes;
    use std::time::Duration;

    fn record(data: &[u8]) -> SessionRecord {
        SessionRecord {
            buffer: Bytes::copy_from_slice(data),
            format: EncodeFormat::Png,
            original_name: "photo.png".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn session_id_is_32_hex_chars() {
        let id = SessionStore::new_session_id();
        assert_eq!(id.len(), 32);
        assert!(SessionStore::is_valid_id(&id));
        assert!(!SessionStore::is_valid_id("short"));
        assert!(!SessionStore::is_valid_id(
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"
        ));
    }

    #[tokio::test]
    async fn put_overwrites_existing_buffer() {
        let store = SessionStore::with_ttl(Duration::from_secs(60), 1024 * 1024);
        let id = SessionStore::new_session_id();

        store.put(id.clone(), record(b"first")).await;
        store.put(id.clone(), record(b"second")).await;

        let got = store.get(&id).await.expect("session present");
        assert_eq!(&got.buffer[..], b"second");
    }

    #[tokio::test]
    async fn expired_session_is_gone_after_ttl() {
        let store = SessionStore::with_ttl(Duration::from_millis(50), 1024 * 1024);
        let id = SessionStore::new_session_id();
        store.put(id.clone(), record(b"data")).await;

        assert!(store.get(&id).await.is_some());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn remove_reports_whether_entry_existed() {
        let store = SessionStore::with_ttl(Duration::from_secs(60), 1024 * 1024);
        let id = SessionStore::new_session_id();
        store.put(id.clone(), record(b"data")).await;

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
    }
}
