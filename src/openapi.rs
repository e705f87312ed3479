use utoipa::OpenApi;
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::Modify;

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api/v1`（对应 `config.api.prefix` / `APP_API_PREFIX`）。
/// - `/health` 不带前缀，因此额外提供 `/` 作为备用 server 以便在 Swagger UI 中切换测试。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API_PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health 等不带前缀接口）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::transform::handler::resize_image,
        crate::features::transform::handler::crop_image,
        crate::features::transform::handler::rotate_image,
        crate::features::watermark::handler::watermark_image,
        crate::features::matting::handler::matting_image,
        crate::features::compress::handler::compress_image,
        crate::features::pdf::handler::convert_to_pdf,
        crate::features::session::handler::download_session,
        crate::features::session::handler::delete_session,
    ),
    components(
        schemas(
            crate::error::AppError,
            crate::respond::ProcessResponse,
            crate::features::compress::handler::CompressResponse,
            crate::features::session::handler::DeleteSessionResponse,
            crate::features::health::handler::HealthResponse,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (
            name = "Transform",
            description = "基础变换：缩放、裁剪、旋转/翻转（支持 png/jpeg/webp 输出）。"
        ),
        (name = "Watermark", description = "水印合成：锚点定位、透明度与缩放控制。"),
        (name = "Matting", description = "抠图：色键背景去除，输出带透明通道的 PNG。"),
        (name = "Compress", description = "压缩：有损/无损重编码并报告压缩比。"),
        (name = "Pdf", description = "PDF：多图按序合并为每图一页的 PDF。"),
        (
            name = "Session",
            description = "处理会话：下载最近产物、显式删除。会话通过 X-Session-ID 续作。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Pixform Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "图片处理后端服务 API（Axum + utoipa）。注意：除 /health 外，其余业务接口实际挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
