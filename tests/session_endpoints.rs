use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Request, StatusCode, header},
};
use std::time::Duration;
use tower::ServiceExt;

use pixform_backend::AppState;
use pixform_backend::codec::EncodeFormat;
use pixform_backend::features::session::create_session_router;
use pixform_backend::features::session::store::{SessionRecord, SessionStore};

fn record(data: &[u8], format: EncodeFormat) -> SessionRecord {
    SessionRecord {
        buffer: Bytes::copy_from_slice(data),
        format,
        original_name: "photo.png".to_string(),
        created_at: chrono::Utc::now(),
    }
}

fn build_app(ttl: Duration) -> (Router, SessionStore) {
    let store = SessionStore::with_ttl(ttl, 64 * 1024 * 1024);
    let state = AppState {
        sessions: store.clone(),
        processing_semaphore: std::sync::Arc::new(tokio::sync::Semaphore::new(2)),
    };
    let app = Router::new().merge(create_session_router()).with_state(state);
    (app, store)
}

#[tokio::test]
async fn download_returns_stored_bytes_with_content_headers() {
    let (app, store) = build_app(Duration::from_secs(60));
    let id = SessionStore::new_session_id();
    store
        .put(id.clone(), record(b"fake-jpeg-bytes", EncodeFormat::Jpeg))
        .await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/download/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/jpeg")
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(disposition.contains(".jpg"), "{disposition}");

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake-jpeg-bytes");
}

#[tokio::test]
async fn download_unknown_session_is_404() {
    let (app, _store) = build_app(Duration::from_secs(60));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/download/0123456789abcdef0123456789abcdef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn download_malformed_id_is_400() {
    let (app, _store) = build_app(Duration::from_secs(60));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/download/short")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (app, store) = build_app(Duration::from_secs(60));
    let id = SessionStore::new_session_id();
    store
        .put(id.clone(), record(b"data", EncodeFormat::Png))
        .await;

    let delete_req = |id: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/session/{id}"))
            .body(Body::empty())
            .unwrap()
    };

    let resp = app.clone().oneshot(delete_req(&id)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["deleted"], true);
    assert_eq!(v["sessionId"], id);

    // 重复删除仍然 200，但 deleted=false
    let resp = app.clone().oneshot(delete_req(&id)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["deleted"], false);

    // 删除后下载应 404
    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/download/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_session_download_is_404() {
    let (app, store) = build_app(Duration::from_millis(50));
    let id = SessionStore::new_session_id();
    store
        .put(id.clone(), record(b"data", EncodeFormat::Png))
        .await;

    tokio::time::sleep(Duration::from_millis(120)).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/download/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
