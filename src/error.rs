use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 缺少必需字段（multipart 表单字段缺失）
    #[error("缺少必需字段: {0}")]
    MissingField(String),

    /// 参数校验错误（字段存在但取值非法）
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 会话不存在或已过期
    #[error("会话不存在或已过期: {0}")]
    SessionNotFound(String),

    /// 不支持的图片格式 / 无法识别的上传内容
    #[error("不支持的图片格式: {0}")]
    UnsupportedMedia(String),

    /// 上传内容超过限制
    #[error("上传内容超过限制: {0}")]
    PayloadTooLarge(String),

    /// 图像处理错误（解码/变换/编码阶段失败）
    #[error("图像处理错误: {0}")]
    ImageProcess(String),

    /// PDF 组装错误
    #[error("PDF 组装错误: {0}")]
    Pdf(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 设计目标：
/// - 让所有 API 错误返回结构化 JSON，便于 SDK/调用方稳定处理
/// - 与 OpenAPI 一致（content-type = application/problem+json）
/// - 允许在不破坏主结构的前提下扩展字段（如 requestId）
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Validation Failed")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 400)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "VALIDATION_FAILED")]
    pub code: String,

    /// 可选：请求追踪 ID（由 request-id middleware 回填）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingField(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ImageProcess(_) | AppError::Pdf(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::MissingField(_) => "MISSING_FIELD",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::UnsupportedMedia(_) => "UNSUPPORTED_MEDIA",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::ImageProcess(_) => "IMAGE_PROCESS_FAILED",
            AppError::Pdf(_) => "PDF_BUILD_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "Unsupported Media Type",
            StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => AppError::UnsupportedMedia(e.to_string()),
            other => AppError::ImageProcess(other.to_string()),
        }
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Pdf(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        // axum 将超限的 body 也归为 multipart 读取失败，按其建议状态码区分。
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("multipart 读取失败: {err}"))
        } else {
            AppError::Validation(format!("multipart 解析失败: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn missing_field_maps_to_400() {
        let resp = AppError::MissingField("file".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn session_not_found_maps_to_404() {
        let resp = AppError::SessionNotFound("deadbeef".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn image_process_maps_to_500() {
        let resp = AppError::ImageProcess("encode".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
