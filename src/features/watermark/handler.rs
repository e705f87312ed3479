use axum::{
    Router,
    extract::{Multipart, Query, State},
    http::HeaderMap,
    response::Response,
    routing::post,
};

use crate::codec::{self, EncodeFormat};
use crate::error::AppError;
use crate::pipeline::{self, effective_quality};
use crate::respond::{OutputQuery, ProcessResponse};
use crate::state::AppState;
use crate::upload::FormFields;

use super::compositor::{self, Anchor, WatermarkOptions};

#[utoipa::path(
    post,
    path = "/image/watermark",
    summary = "叠加图片水印",
    description = "multipart 表单：`file`（底图，或改用 X-Session-ID 续作）、`mark`（水印图，必填）、\
        `position`（north-west/north-east/center/south-west/south-east，默认 south-east）、\
        `opacity`（0.0-1.0，默认 0.5）、`margin`（像素，默认 16）、`scale`（水印相对底图短边占比上限，默认 0.25）。",
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
    tag = "Watermark"
)]
pub async fn watermark_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let mark = fields.require_file("mark")?;
    if mark.bytes.is_empty() {
        return Err(AppError::Validation("mark 内容为空".to_string()));
    }

    let mut opts = WatermarkOptions::default();
    if let Some(p) = fields.text("position") {
        opts.anchor = Anchor::parse(p)?;
    }
    if let Some(o) = fields.opt_f32("opacity")? {
        opts.opacity = o;
    }
    if let Some(m) = fields.opt_u32("margin")? {
        opts.margin = m;
    }
    if let Some(s) = fields.opt_f32("scale")? {
        opts.scale = s;
    }
    let format = fields.text("format").map(EncodeFormat::parse).transpose()?;
    let quality = effective_quality(fields.opt_u8("quality")?)?;

    let input = src.bytes.clone();
    let mark_bytes = mark.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (base, in_fmt) = codec::decode(&input)?;
        let (mark_img, _) = codec::decode(&mark_bytes)?;
        let out = compositor::apply_watermark(&base, &mark_img, &opts)?;
        let fmt = format.unwrap_or_else(|| EncodeFormat::from_input(in_fmt));
        let data = codec::encode(&out, fmt, quality)?;
        Ok((data, fmt, out.width(), out.height()))
    })
    .await?;

    pipeline::store_and_respond(&state, &q, src.session_id, &src.original_name, fmt, w, h, data)
        .await
}

pub fn create_watermark_router() -> Router<AppState> {
    Router::new().route("/image/watermark", post(watermark_image))
}
