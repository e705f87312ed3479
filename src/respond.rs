//! 处理端点的统一出参：JSON 预览（默认）或二进制直出。

use axum::Json;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::codec::EncodeFormat;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::upload::sanitize_file_stem;

/// 输出模式（Query 传入）：`response=json`（默认）或 `response=binary`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputQuery {
    #[serde(default)]
    pub response: Option<String>,
}

impl OutputQuery {
    pub fn wants_binary(&self) -> Result<bool, AppError> {
        match self.response.as_deref() {
            None | Some("json") => Ok(false),
            Some("binary") => Ok(true),
            Some(other) => Err(AppError::Validation(format!(
                "response 取值非法: {other}（支持 json/binary）"
            ))),
        }
    }
}

/// 处理结果（JSON 模式）
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// 会话 ID，可用于续作（X-Session-ID）、下载与删除
    #[schema(example = "3f2a9c0d8e7b4a619c5d2e8f0a1b3c4d")]
    pub session_id: String,
    /// 输出编码
    #[schema(example = "png")]
    pub format: String,
    /// 输出宽度（像素）
    pub width: u32,
    /// 输出高度（像素）
    pub height: u32,
    /// 输出字节数
    pub size_bytes: usize,
    /// base64 data URI 预览
    pub preview: String,
    /// 下载地址（含 API 前缀）
    #[schema(example = "/api/v1/download/3f2a9c0d8e7b4a619c5d2e8f0a1b3c4d")]
    pub download_url: String,
}

/// 由原始文件名与会话 ID 派生下载文件名
pub fn attachment_file_name(original_name: &str, session_id: &str, fmt: EncodeFormat) -> String {
    let stem = sanitize_file_stem(original_name);
    let tag = session_id.get(..8).unwrap_or(session_id);
    format!("{stem}_{tag}.{}", fmt.extension())
}

/// 构造二进制直出响应（Content-Disposition: attachment）
pub fn binary_response(
    bytes: Bytes,
    fmt: EncodeFormat,
    original_name: &str,
    session_id: &str,
) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(fmt.content_type()),
    );
    let file_name = attachment_file_name(original_name, session_id, fmt);
    let disposition = format!("attachment; filename=\"{file_name}\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::Internal(format!("构造响应头失败: {e}")))?,
    );
    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// base64 data URI 预览
pub fn data_url(fmt: EncodeFormat, bytes: &Bytes) -> String {
    format!(
        "data:{};base64,{}",
        fmt.content_type(),
        BASE64.encode(bytes)
    )
}

/// 会话二进制下载地址（含 API 前缀）
pub fn download_url(session_id: &str) -> String {
    format!("{}/download/{}", AppConfig::global().api.prefix, session_id)
}

/// 构造处理端点的出参：JSON 预览或二进制直出
#[allow(clippy::too_many_arguments)]
pub fn process_output(
    query: &OutputQuery,
    session_id: String,
    fmt: EncodeFormat,
    width: u32,
    height: u32,
    bytes: Bytes,
    original_name: &str,
) -> Result<Response, AppError> {
    if query.wants_binary()? {
        return binary_response(bytes, fmt, original_name, &session_id);
    }

    let preview = data_url(fmt, &bytes);
    let download = download_url(&session_id);
    let body = ProcessResponse {
        session_id,
        format: fmt.code().to_string(),
        width,
        height,
        size_bytes: bytes.len(),
        preview,
        download_url: download,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::{OutputQuery, attachment_file_name};
    use crate::codec::EncodeFormat;

    #[test]
    fn output_query_defaults_to_json() {
        let q = OutputQuery::default();
        assert!(!q.wants_binary().unwrap());

        let q = OutputQuery {
            response: Some("binary".into()),
        };
        assert!(q.wants_binary().unwrap());

        let q = OutputQuery {
            response: Some("xml".into()),
        };
        assert!(q.wants_binary().is_err());
    }

    #[test]
    fn attachment_name_uses_stem_session_tag_and_extension() {
        let name =
            attachment_file_name("vacation.png", "3f2a9c0d8e7b4a619c5d2e8f0a1b3c4d", EncodeFormat::Jpeg);
        assert_eq!(name, "vacation_3f2a9c0d.jpg");
    }
}
