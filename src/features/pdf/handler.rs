use axum::{
    Router,
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use std::time::Instant;

use crate::codec;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::session::store::SessionStore;
use crate::pipeline;
use crate::state::AppState;
use crate::upload::{FormFields, sanitize_file_stem};

use super::builder::{self, PageImage, PageSpec};

#[utoipa::path(
    post,
    path = "/pdf/convert",
    summary = "图片合并为 PDF",
    description = "multipart 表单：`files`（同名重复，1 张起，按提交顺序成页）、\
        `page`（fit/a4/letter，默认 fit）、`margin`（页边距，单位 pt，0-200，默认 0）、\
        `quality`（嵌入 JPEG 的质量，1-100）。仅二进制返回 application/pdf，不写入会话。",
    responses(
        (status = 200, description = "PDF 字节", content_type = "application/pdf"),
        (status = 400, description = "字段缺失或取值非法", body = AppError),
        (status = 413, description = "请求体超限", body = AppError),
        (status = 415, description = "无法识别的图片内容", body = AppError),
        (status = 500, description = "PDF 组装失败", body = AppError)
    ),
    tag = "Pdf"
)]
pub async fn convert_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let t_total = Instant::now();
    let fields = FormFields::collect(multipart).await?;

    let uploads = fields.files("files");
    if uploads.is_empty() {
        return Err(AppError::MissingField("files".to_string()));
    }
    let max_images = AppConfig::global().processing.max_pdf_images;
    if uploads.len() > max_images {
        return Err(AppError::Validation(format!(
            "最多接受 {max_images} 张图片，收到 {}",
            uploads.len()
        )));
    }

    let spec = fields
        .text("page")
        .map(PageSpec::parse)
        .transpose()?
        .unwrap_or_default();
    let margin = fields.opt_f32("margin")?.unwrap_or(0.0);
    if !(0.0..=200.0).contains(&margin) {
        return Err(AppError::Validation(format!(
            "margin 必须在 0-200 pt 之间: {margin}"
        )));
    }
    let quality = pipeline::effective_quality(fields.opt_u8("quality")?)?;

    let first_name = sanitize_file_stem(&uploads[0].file_name);
    let inputs: Vec<Bytes> = uploads.iter().map(|f| f.bytes.clone()).collect();
    let page_count = inputs.len();

    let pdf = pipeline::run_blocking(&state, move || {
        let mut pages = Vec::with_capacity(inputs.len());
        for bytes in &inputs {
            let (img, _) = codec::decode(bytes)?;
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let mut jpeg = Vec::new();
            let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| AppError::ImageProcess(format!("JPEG 编码失败: {e}")))?;
            pages.push(PageImage {
                jpeg,
                width: w,
                height: h,
            });
        }
        builder::build_pdf(pages, spec, margin)
    })
    .await?;

    tracing::debug!(
        target: "pixform::pdf",
        pages = page_count,
        bytes = pdf.len(),
        total_ms = t_total.elapsed().as_millis() as u64,
        "PDF 组装完成"
    );

    let tag = SessionStore::new_session_id();
    let file_name = format!("{first_name}_{}.pdf", tag.get(..8).unwrap_or(&tag));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    let disposition = format!("attachment; filename=\"{file_name}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::Internal(format!("构造响应头失败: {e}")))?,
    );
    Ok((StatusCode::OK, headers, pdf).into_response())
}

pub fn create_pdf_router() -> Router<AppState> {
    Router::new().route("/pdf/convert", post(convert_to_pdf))
}
