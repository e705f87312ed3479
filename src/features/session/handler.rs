use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::{delete, get},
};
use serde::Serialize;

use crate::error::AppError;
use crate::respond::binary_response;
use crate::state::AppState;

use super::store::SessionStore;

/// 删除会话的响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionResponse {
    /// 会话 ID
    pub session_id: String,
    /// 会话是否确实存在并被删除（重复删除返回 false）
    pub deleted: bool,
}

#[utoipa::path(
    get,
    path = "/download/{session_id}",
    summary = "下载会话最近一次处理结果",
    description = "以二进制返回会话的最近产物，带 Content-Disposition；会话不存在或已过期返回 404。",
    params(("session_id" = String, Path, description = "会话 ID（32 位 hex）")),
    responses(
        (status = 200, description = "图片字节"),
        (status = 400, description = "会话 ID 格式非法", body = AppError),
        (status = 404, description = "会话不存在或已过期", body = AppError)
    ),
    tag = "Session"
)]
pub async fn download_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let session_id = session_id.trim().to_ascii_lowercase();
    if !SessionStore::is_valid_id(&session_id) {
        return Err(AppError::Validation(format!(
            "会话 ID 格式非法（期望 32 位 hex）: {session_id}"
        )));
    }

    let record = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    binary_response(
        record.buffer,
        record.format,
        &record.original_name,
        &session_id,
    )
}

#[utoipa::path(
    delete,
    path = "/session/{session_id}",
    summary = "删除会话",
    description = "显式释放会话占用的内存。幂等：会话不存在时仍返回 200，deleted=false。",
    params(("session_id" = String, Path, description = "会话 ID（32 位 hex）")),
    responses(
        (status = 200, description = "删除结果", body = DeleteSessionResponse),
        (status = 400, description = "会话 ID 格式非法", body = AppError)
    ),
    tag = "Session"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, AppError> {
    let session_id = session_id.trim().to_ascii_lowercase();
    if !SessionStore::is_valid_id(&session_id) {
        return Err(AppError::Validation(format!(
            "会话 ID 格式非法（期望 32 位 hex）: {session_id}"
        )));
    }

    let deleted = state.sessions.remove(&session_id).await;
    if deleted {
        tracing::debug!(target: "pixform::session", session = %session_id, "会话已删除");
    }
    Ok(Json(DeleteSessionResponse {
        session_id,
        deleted,
    }))
}

pub fn create_session_router() -> Router<AppState> {
    Router::new()
        .route("/download/:session_id", get(download_session))
        .route("/session/:session_id", delete(delete_session))
}
