//! 请求 ID：贯穿日志与 ProblemDetails 的追踪标识。

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

/// 请求/响应共用的追踪头
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static CURRENT: String;
}

/// 当前请求绑定的 request_id（仅在中间件作用域内有值）。
pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|v| v.clone()).ok()
}

/// 单个请求的追踪 ID。客户端提交的合法值原样透传，否则服务端生成。
#[derive(Debug, Clone)]
pub struct RequestId(String);

impl RequestId {
    const MAX_LEN: usize = 128;

    /// 从请求头解析；缺失或非法时生成新 ID。
    pub fn from_request(req: &Request) -> Self {
        req.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| Self::parse(raw.trim()))
            .unwrap_or_else(Self::generate)
    }

    /// 只接受日志安全的字符集，防止客户端注入控制字符或换行。
    fn parse(raw: &str) -> Option<Self> {
        let ok = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        ok.then(|| Self(raw.to_string()))
    }

    fn generate() -> Self {
        Self(format!("px_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 全局中间件：解析/生成 request_id，注入任务上下文并回写响应头。
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_request(&req);
    req.extensions_mut().insert(id.clone());

    let mut res = CURRENT
        .scope(id.as_str().to_string(), async move { next.run(req).await })
        .await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
