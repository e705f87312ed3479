use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tower::ServiceExt;

/// 契约关键点：全局错误必须为 RFC7807 ProblemDetails（application/problem+json）。
#[tokio::test]
async fn app_error_into_response_is_problem_details() {
    let resp = pixform_backend::AppError::Validation("width 必须是非负整数: x".to_string())
        .into_response();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("missing Content-Type")
        .to_str()
        .expect("invalid Content-Type");
    assert_eq!(content_type, "application/problem+json");

    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");

    // 核心字段（强一致契约）
    assert_eq!(v["status"], 400);
    assert_eq!(v["code"], "VALIDATION_FAILED");
    assert!(v.get("type").is_some());
    assert!(v.get("title").is_some());
    assert!(v.get("detail").is_some());
}

/// 契约关键点：错误码与 HTTP 状态的映射稳定。
#[tokio::test]
async fn error_variants_map_to_expected_status_and_code() {
    let cases = [
        (
            pixform_backend::AppError::MissingField("file".into()),
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
        ),
        (
            pixform_backend::AppError::SessionNotFound("deadbeef".into()),
            StatusCode::NOT_FOUND,
            "SESSION_NOT_FOUND",
        ),
        (
            pixform_backend::AppError::UnsupportedMedia("text/plain".into()),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_MEDIA",
        ),
        (
            pixform_backend::AppError::PayloadTooLarge("30MiB".into()),
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
        ),
        (
            pixform_backend::AppError::ImageProcess("decode".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "IMAGE_PROCESS_FAILED",
        ),
    ];

    for (err, status, code) in cases {
        let resp = err.into_response();
        assert_eq!(resp.status(), status);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["code"], code);
    }
}

/// 契约关键点：对外 JSON 字段命名统一 camelCase。
#[test]
fn delete_session_response_serializes_as_camel_case() {
    use pixform_backend::features::session::handler::DeleteSessionResponse;

    let v = serde_json::to_value(DeleteSessionResponse {
        session_id: "3f2a9c0d8e7b4a619c5d2e8f0a1b3c4d".to_string(),
        deleted: true,
    })
    .expect("serialize json");

    assert!(v.get("sessionId").is_some());
    assert!(v.get("session_id").is_none());
}

async fn fail_handler() -> Result<&'static str, pixform_backend::AppError> {
    Err(pixform_backend::AppError::Validation("bad request".into()))
}

fn build_app() -> Router {
    Router::new()
        .route("/fail", get(fail_handler))
        .layer(axum::middleware::from_fn(
            pixform_backend::request_id::request_id_middleware,
        ))
}

/// request-id 中间件应透传客户端合法值，并回填到 ProblemDetails。
#[tokio::test]
async fn problem_details_contains_request_id() {
    let app = build_app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/fail")
                .header("x-request-id", "err.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /fail");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("err.req-001")
    );

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["requestId"], "err.req-001");
}

/// request-id 缺失时应由服务端生成。
#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let app = build_app();
    let resp = app
        .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
        .await
        .expect("request /fail");

    let request_id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(request_id.starts_with("px_"), "got: {request_id}");
}
