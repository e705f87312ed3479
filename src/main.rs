use axum::extract::DefaultBodyLimit;
use axum::{Router, routing::get};
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pixform_backend::features::compress::create_compress_router;
use pixform_backend::features::health::handler::health_check;
use pixform_backend::features::matting::create_matting_router;
use pixform_backend::features::pdf::create_pdf_router;
use pixform_backend::features::session::create_session_router;
use pixform_backend::features::transform::create_transform_router;
use pixform_backend::features::watermark::create_watermark_router;
use pixform_backend::openapi::ApiDoc;
use pixform_backend::{AppConfig, AppState, ShutdownManager, cors, request_id};

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 压缩策略：明确排除不该压缩的响应，而不是全局默认。
    //
    // - 图片响应本身已压缩，再压缩只浪费 CPU
    // - application/pdf 内部流已用 Flate/DCT 压缩
    // - application/octet-stream 等二进制下载收益不确定
    //
    // 保留默认的最小大小阈值（32B），避免压缩开销覆盖收益。
    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/pdf"))
        .and(NotForContentType::const_new("application/octet-stream"))
        .and(NotForContentType::const_new("application/zip"))
        .and(NotForContentType::const_new("application/gzip"))
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        // 命中 SizeAbove（默认 32B），避免因为 body 太小导致测试不稳定。
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compression_predicate_disables_images() {
        assert!(!should_compress_for("image/png"));
        assert!(!should_compress_for("image/jpeg"));
        assert!(!should_compress_for("image/webp"));
    }

    #[test]
    fn compression_predicate_disables_pdf_and_binary_downloads() {
        assert!(!should_compress_for("application/pdf"));
        assert!(!should_compress_for("application/octet-stream"));
    }

    #[test]
    fn compression_predicate_keeps_json() {
        assert!(should_compress_for("application/json"));
        assert!(should_compress_for("application/problem+json"));
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixform_backend=info,tower_http=info".into()),
        )
        .init();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("配置初始化失败: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 启动信号处理器
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    // Shared state
    let app_state = AppState::from_config(config);

    // 会话后台维护任务（过期回收、容量淘汰）
    app_state.sessions.spawn_sweeper(
        config.session.sweep_interval_duration(),
        shutdown_manager.clone(),
    );

    // Routes
    let api_router = Router::<AppState>::new()
        .merge(create_transform_router())
        .merge(create_watermark_router())
        .merge(create_matting_router())
        .merge(create_compress_router())
        .merge(create_pdf_router())
        .merge(create_session_router());

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // 请求 ID：透传或生成，并回写响应头
    app = app.layer(axum::middleware::from_fn(request_id::request_id_middleware));

    // CORS（按配置启用）
    if let Some(cors_layer) = cors::build_cors_layer(&config.cors) {
        app = app.layer(cors_layer);
    }

    // 上传大小限制：multipart 端点都是内存内处理，必须有上限
    app = app.layer(DefaultBodyLimit::max(config.processing.max_upload_bytes));

    // 响应压缩：JSON/文本收益明显，图片与 PDF 明确排除
    app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("监听地址绑定失败 {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Image API: http://{}{}/image", addr, config.api.prefix);
    tracing::info!("PDF API: http://{}{}/pdf/convert", addr, config.api.prefix);

    // 启动服务器并等待优雅退出信号
    let shutdown_timeout = config.shutdown.timeout_duration();
    let shutdown_signal = async move {
        let reason = shutdown_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅退出...", reason);

        // 会话都在内存里，无需持久化。超时兜底：在途请求迟迟不结束时强制退出。
        tokio::spawn(async move {
            tokio::time::sleep(shutdown_timeout).await;
            tracing::warn!("优雅退出超时，强制退出");
            std::process::exit(0);
        });
    };

    let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal.await;
        tracing::info!("开始优雅关闭HTTP服务器...");
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
