use axum::{
    Router,
    extract::{Multipart, Query, State},
    http::HeaderMap,
    response::Response,
    routing::post,
};
use std::time::Instant;

use crate::codec::{self, EncodeFormat};
use crate::error::AppError;
use crate::pipeline::{self, effective_quality};
use crate::respond::{OutputQuery, ProcessResponse};
use crate::state::AppState;
use crate::upload::FormFields;

use super::ops::{self, Fit, FlipMode, Rotation};

#[utoipa::path(
    post,
    path = "/image/resize",
    summary = "缩放图片",
    description = "multipart 表单：`file`（图片，或改用 X-Session-ID 续作）、`width`/`height`（至少一个，1-10000）、\
        `fit`（contain/cover/fill，默认 contain）、`format`（png/jpeg/webp，默认保持源格式）、`quality`（1-100）。\
        结果写回会话；`?response=binary` 直接返回图片字节。",
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
    tag = "Transform"
)]
pub async fn resize_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let t_total = Instant::now();
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let width = fields.opt_u32("width")?;
    let height = fields.opt_u32("height")?;
    let fit = fields
        .text("fit")
        .map(Fit::parse)
        .transpose()?
        .unwrap_or_default();
    let format = fields.text("format").map(EncodeFormat::parse).transpose()?;
    let quality = effective_quality(fields.opt_u8("quality")?)?;

    let input = src.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (img, in_fmt) = codec::decode(&input)?;
        let out = ops::resize(&img, width, height, fit)?;
        let fmt = format.unwrap_or_else(|| EncodeFormat::from_input(in_fmt));
        let data = codec::encode(&out, fmt, quality)?;
        Ok((data, fmt, out.width(), out.height()))
    })
    .await?;

    tracing::debug!(
        target: "pixform::transform",
        session = %src.session_id,
        out_w = w,
        out_h = h,
        bytes = data.len(),
        total_ms = t_total.elapsed().as_millis() as u64,
        "resize 完成"
    );
    pipeline::store_and_respond(&state, &q, src.session_id, &src.original_name, fmt, w, h, data)
        .await
}

#[utoipa::path(
    post,
    path = "/image/crop",
    summary = "裁剪图片",
    description = "multipart 表单：`file`（或 X-Session-ID 续作）、`x`/`y`/`width`/`height`（必填，矩形须完全在原图内）、\
        `format`、`quality` 同缩放端点。",
    params(
        ("response" = Option<String>, Query, description = "出参模式：json（默认）|binary"),
        ("X-Session-ID" = Option<String>, Header, description = "续作会话 ID（32 位 hex）")
    ),
    responses(
        (status = 200, description = "处理成功", body = ProcessResponse),
        (status = 400, description = "字段缺失、取值非法或越界", body = AppError),
        (status = 404, description = "会话不存在或已过期", body = AppError),
        (status = 415, description = "无法识别的图片内容", body = AppError),
        (status = 500, description = "处理失败", body = AppError)
    ),
    tag = "Transform"
)]
pub async fn crop_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let x = fields.require_u32("x")?;
    let y = fields.require_u32("y")?;
    let width = fields.require_u32("width")?;
    let height = fields.require_u32("height")?;
    let format = fields.text("format").map(EncodeFormat::parse).transpose()?;
    let quality = effective_quality(fields.opt_u8("quality")?)?;

    let input = src.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (img, in_fmt) = codec::decode(&input)?;
        let out = ops::crop(&img, x, y, width, height)?;
        let fmt = format.unwrap_or_else(|| EncodeFormat::from_input(in_fmt));
        let data = codec::encode(&out, fmt, quality)?;
        Ok((data, fmt, out.width(), out.height()))
    })
    .await?;

    pipeline::store_and_respond(&state, &q, src.session_id, &src.original_name, fmt, w, h, data)
        .await
}

#[utoipa::path(
    post,
    path = "/image/rotate",
    summary = "旋转/翻转图片",
    description = "multipart 表单：`file`（或 X-Session-ID 续作，支持上一步结果的多步编辑）、\
        `angle`（90/180/270）与 `flip`（horizontal/vertical）至少一个，先旋转后翻转。",
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
    tag = "Transform"
)]
pub async fn rotate_image(
    State(state): State<AppState>,
    Query(q): Query<OutputQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let fields = FormFields::collect(multipart).await?;
    let src = pipeline::resolve_source(&state, &headers, &fields).await?;

    let angle = fields.text("angle").map(Rotation::parse).transpose()?;
    let flip = fields.text("flip").map(FlipMode::parse).transpose()?;
    if angle.is_none() && flip.is_none() {
        return Err(AppError::MissingField("angle 或 flip".to_string()));
    }
    let format = fields.text("format").map(EncodeFormat::parse).transpose()?;
    let quality = effective_quality(fields.opt_u8("quality")?)?;

    let input = src.bytes.clone();
    let (data, fmt, w, h) = pipeline::run_blocking(&state, move || {
        let (img, in_fmt) = codec::decode(&input)?;
        let out = ops::rotate_flip(&img, angle, flip);
        let fmt = format.unwrap_or_else(|| EncodeFormat::from_input(in_fmt));
        let data = codec::encode(&out, fmt, quality)?;
        Ok((data, fmt, out.width(), out.height()))
    })
    .await?;

    pipeline::store_and_respond(&state, &q, src.session_id, &src.original_name, fmt, w, h, data)
        .await
}

pub fn create_transform_router() -> Router<AppState> {
    Router::new()
        .route("/image/resize", post(resize_image))
        .route("/image/crop", post(crop_image))
        .route("/image/rotate", post(rotate_image))
}
