//! 按配置构建 CORS 中间件。
//!
//! 浏览器客户端依赖 `X-Session-ID`（续作）与 `X-Request-Id`（追踪），
//! 因此显式白名单模式下这两个头会自动并入 allow/expose 列表。

use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;
use crate::pipeline::SESSION_HEADER;
use crate::request_id::REQUEST_ID_HEADER;

/// 配置列表的解析结果：出现 `*` 即任意，否则为解析成功的显式值。
enum Allowed<T> {
    Any,
    List(Vec<T>),
}

impl<T> Allowed<T> {
    fn parse(label: &str, values: &[String], parse: impl Fn(&str) -> Option<T>) -> Self {
        let mut list = Vec::new();
        for raw in values {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            if value == "*" {
                return Self::Any;
            }
            match parse(value) {
                Some(item) => list.push(item),
                None => tracing::warn!("CORS {} 含无效值: {}", label, value),
            }
        }
        Self::List(list)
    }

    fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

fn parse_header_name(v: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
}

/// 显式列表模式下补上 API 自身依赖的头（去重）。
fn with_api_headers(mut list: Vec<HeaderName>) -> Vec<HeaderName> {
    for raw in [SESSION_HEADER, REQUEST_ID_HEADER] {
        let name = HeaderName::from_static(raw);
        if !list.contains(&name) {
            list.push(name);
        }
    }
    list
}

/// 根据配置构建 CORS 中间件。配置自相矛盾时拒绝启用而不是带病上线。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = Allowed::parse("allowed_origins", &cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    if let Allowed::List(list) = &origins
        && list.is_empty()
    {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let methods = Allowed::parse("allowed_methods", &cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    let headers = Allowed::parse("allowed_headers", &cors.allowed_headers, parse_header_name);
    let expose = Allowed::parse("expose_headers", &cors.expose_headers, parse_header_name);

    if cors.allow_credentials
        && (origins.is_any() || methods.is_any() || headers.is_any() || expose.is_any())
    {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new();

    layer = match origins {
        Allowed::Any => layer.allow_origin(Any),
        Allowed::List(list) => layer.allow_origin(list),
    };
    layer = match methods {
        Allowed::Any => layer.allow_methods(Any),
        Allowed::List(list) if !list.is_empty() => layer.allow_methods(list),
        Allowed::List(_) => layer,
    };
    layer = match headers {
        Allowed::Any => layer.allow_headers(Any),
        Allowed::List(list) => layer.allow_headers(with_api_headers(list)),
    };
    layer = match expose {
        Allowed::Any => layer.expose_headers(Any),
        Allowed::List(list) => layer.expose_headers(with_api_headers(list)),
    };

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}
