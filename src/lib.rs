/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 图片编解码与格式识别
pub mod codec;

/// multipart 表单收集与字段解析
pub mod upload;

/// 处理端点统一出参
pub mod respond;

/// 端点共用的请求流水线
pub mod pipeline;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// 请求 ID 中间件
pub mod request_id;

/// CORS 配置构建
pub mod cors;

/// OpenAPI 文档聚合
pub mod openapi;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
