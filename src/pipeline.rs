//! 处理端点共用的请求流水线：输入解析（上传或会话续作）、
//! 阻塞任务调度、会话写回与出参构造。

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;

use crate::codec::EncodeFormat;
use crate::error::AppError;
use crate::features::session::store::{SessionRecord, SessionStore};
use crate::respond::{OutputQuery, process_output};
use crate::state::AppState;
use crate::upload::FormFields;

/// 会话续作使用的请求头
pub const SESSION_HEADER: &str = "x-session-id";

/// 解析后的待处理输入
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Bytes,
    pub original_name: String,
    /// 本次操作归属的会话 ID（上传时沿用请求头 ID 或新建）
    pub session_id: String,
}

fn header_session_id(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .map_err(|_| AppError::Validation("X-Session-ID 含非法字符".to_string()))?
        .trim()
        .to_ascii_lowercase();
    if !SessionStore::is_valid_id(&id) {
        return Err(AppError::Validation(format!(
            "X-Session-ID 格式非法（期望 32 位 hex）: {id}"
        )));
    }
    Ok(Some(id))
}

/// 确定本次操作的输入字节：
/// - 表单带 `file` 时使用上传内容（会话 ID 沿用请求头或新建）；
/// - 否则要求 `X-Session-ID` 指向一个存活会话，续用其最近产物；
/// - 两者都没有则按缺字段处理。
pub async fn resolve_source(
    state: &AppState,
    headers: &HeaderMap,
    fields: &FormFields,
) -> Result<SourceImage, AppError> {
    let header_id = header_session_id(headers)?;

    if let Some(f) = fields.file("file") {
        if f.bytes.is_empty() {
            return Err(AppError::Validation("file 内容为空".to_string()));
        }
        let session_id = header_id.unwrap_or_else(SessionStore::new_session_id);
        return Ok(SourceImage {
            bytes: f.bytes.clone(),
            original_name: f.file_name.clone(),
            session_id,
        });
    }

    if let Some(id) = header_id {
        let record = state
            .sessions
            .get(&id)
            .await
            .ok_or_else(|| AppError::SessionNotFound(id.clone()))?;
        return Ok(SourceImage {
            bytes: record.buffer,
            original_name: record.original_name,
            session_id: id,
        });
    }

    Err(AppError::MissingField("file".to_string()))
}

/// 在信号量许可下执行 CPU 密集型闭包。
/// 解码/变换/编码都是阻塞操作，必须移出 tokio worker。
pub async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let _permit = state
        .processing_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("获取处理信号量失败: {e}")))?;
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("阻塞处理任务执行失败: {e}")))?
}

/// 将处理产物写回会话（创建或整体覆盖），并按请求构造 JSON/二进制出参。
#[allow(clippy::too_many_arguments)]
pub async fn store_and_respond(
    state: &AppState,
    query: &OutputQuery,
    session_id: String,
    original_name: &str,
    fmt: EncodeFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
) -> Result<Response, AppError> {
    let bytes = Bytes::from(data);
    state
        .sessions
        .put(
            session_id.clone(),
            SessionRecord {
                buffer: bytes.clone(),
                format: fmt,
                original_name: original_name.to_string(),
                created_at: Utc::now(),
            },
        )
        .await;
    process_output(
        query,
        session_id,
        fmt,
        width,
        height,
        bytes,
        original_name,
    )
}

/// 有损质量参数：缺省走配置默认值，0 或 >100 一律拒绝。
pub fn effective_quality(requested: Option<u8>) -> Result<u8, AppError> {
    match requested {
        None => Ok(crate::config::AppConfig::global().processing.default_quality),
        Some(q) if (1..=100).contains(&q) => Ok(q),
        Some(q) => Err(AppError::Validation(format!(
            "quality 必须在 1-100 之间: {q}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::header_session_id;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn header_session_id_accepts_valid_hex_and_normalizes_case() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-session-id",
            HeaderValue::from_static("3F2A9C0D8E7B4A619C5D2E8F0A1B3C4D"),
        );
        let id = header_session_id(&headers).unwrap().unwrap();
        assert_eq!(id, "3f2a9c0d8e7b4a619c5d2e8f0a1b3c4d");
    }

    #[test]
    fn header_session_id_rejects_malformed_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", HeaderValue::from_static("not-a-session"));
        assert!(header_session_id(&headers).is_err());
    }

    #[test]
    fn header_session_id_absent_is_none() {
        let headers = HeaderMap::new();
        assert!(header_session_id(&headers).unwrap().is_none());
    }
}
