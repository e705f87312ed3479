use axum::{
    Router,
    extract::{Multipart, Query, State},
    http::HeaderMap,
    response::Response,
    routing::post,
};

use crate::codec::{self, EncodeFormat};
use crate::error::AppError;
use crate::pipeline;
use crate::respond::{OutputQuery, ProcessResponse};
use crate::state::AppState;
use crate::upload::FormFields;

use super::chroma;

#[utoipa::path(
    post,
    path = "/image/matting",
    summary = "色键抠图（背景去除）",
    description = "multipart 表单：`file`（或 X-Session-ID 续作）、`color`（#RRGGBB 键色，缺省取四角均值估计背景色）、\
        `tolerance`（0-255，默认 30；到 2×tolerance 之间做软边过渡）。输出恒为 PNG 以保留透明通道。",
    params(
        ("response" = Option<String>, Query, description = "出参模式：json（默认）|binary"),
        ("X-Session-ID" = Option<String>, Header, description = "续作会话 ID（32 位 hex）")
    ),
    responses(
        (status = 200, description = "处理成功", body = ProcessResponse),
        (status = 400, description = "字段缺失或取值非法", body = AppError),
        (status = 404, description = "会话不存在或已过期", body = AppError),
        (status = 415, description = "无法识别的图片内容", body = AppError),
        (status = 500, description = "处理失败", body = AppError)
    ),
    tag = "Matting"
)]
pub async fn matting_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let key = fields
        .text("color")
        .map(chroma::parse_hex_color)
        .transpose()?;
    let tolerance = fields.opt_u8("tolerance")?.unwrap_or(30);

    let input = src.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (img, _) = codec::decode(&input)?;
        let key = key.unwrap_or_else(|| chroma::estimate_key_color(&img));
        let out = chroma::remove_background(&img, key, tolerance);
        // 透明通道只有 PNG 能无损承载
        let fmt = EncodeFormat::Png;
        let data = codec::encode(&out, fmt, 100)?;
        Ok((data, fmt, out.width(), out.height()))
    })
    .await?;

    pipeline::store_and_respond(&state, &q, src.session_id, &src.original_name, fmt, w, h, data)
        .await
}

pub fn create_matting_router() -> Router<AppState> {
    Router::new().route("/image/matting", post(matting_image))
}
