use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde::Serialize;

use crate::codec::{self, EncodeFormat};
use crate::error::AppError;
use crate::features::session::store::SessionRecord;
use crate::pipeline;
use crate::respond::{self, OutputQuery};
use crate::state::AppState;
use crate::upload::FormFields;

/// 压缩结果（JSON 模式）
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    /// 会话 ID，可用于续作或下载
    pub session_id: String,
    /// 输出格式代号
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// 输入字节数
    pub original_bytes: usize,
    /// 输出字节数
    pub compressed_bytes: usize,
    /// compressedBytes / originalBytes，越小压得越狠
    pub ratio: f64,
    /// data URL 形式的结果预览
    pub preview: String,
    /// 二进制下载地址
    pub download_url: String,
}

#[utoipa::path(
    post,
    path = "/image/compress",
    summary = "压缩图片",
    description = "multipart 表单：`file`（或 X-Session-ID 续作）、`quality`（1-100，默认 75）、\
        `format`（png/jpeg/webp，默认保持源格式；PNG 为无损重编码）。返回压缩前后字节数与压缩比。",
    params(
        ("response" = Option<String>, Query, description = "出参模式：json（默认）|binary"),
        ("X-Session-ID" = Option<String>, Header, description = "续作会话 ID（32 位 hex）")
    ),
    responses(
        (status = 200, description = "处理成功", body = CompressResponse),
        (status = 400, description = "字段缺失或取值非法", body = AppError),
        (status = 404, description = "会话不存在或已过期", body = AppError),
        (status = 415, description = "无法识别的图片内容", body = AppError),
        (status = 500, description = "处理失败", body = AppError)
    ),
    tag = "Compress"
)]
pub async fn compress_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let format = fields.text("format").map(EncodeFormat::parse).transpose()?;
    let quality = match fields.opt_u8("quality")? {
        None => 75,
        Some(v) if (1..=100).contains(&v) => v,
        Some(v) => {
            return Err(AppError::Validation(format!(
                "quality 必须在 1-100 之间: {v}"
            )));
        }
    };

    let original_bytes = src.bytes.len();
    let input = src.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (img, in_fmt) = codec::decode(&input)?;
        let fmt = format.unwrap_or_else(|| EncodeFormat::from_input(in_fmt));
        let data = codec::encode(&img, fmt, quality)?;
        Ok((data, fmt, img.width(), img.height()))
    })
    .await?;

    let compressed_bytes = data.len();
    let bytes = Bytes::from(data);
    state
        .sessions
        .put(
            src.session_id.clone(),
            SessionRecord {
                buffer: bytes.clone(),
                format: fmt,
                original_name: src.original_name.clone(),
                created_at: Utc::now(),
            },
        )
        .await;

    tracing::debug!(
        target: "pixform::compress",
        session = %src.session_id,
        original_bytes,
        compressed_bytes,
        "compress 完成"
    );

    if q.wants_binary()? {
        return respond::binary_response(bytes, fmt, &src.original_name, &src.session_id);
    }

    let ratio = if original_bytes == 0 {
        0.0
    } else {
        compressed_bytes as f64 / original_bytes as f64
    };
    Ok(Json(CompressResponse {
        format: fmt.code().to_string(),
        width: w,
        height: h,
        original_bytes,
        compressed_bytes,
        ratio,
        preview: respond::data_url(fmt, &bytes),
        download_url: respond::download_url(&src.session_id),
        session_id: src.session_id,
    })
    .into_response())
}

pub fn create_compress_router() -> Router<AppState> {
    Router::new().route("/image/compress", post(compress_image))
}
