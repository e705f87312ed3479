use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        3900
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 日志格式
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_format() -> String {
        "full".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    #[serde(default = "ApiConfig::default_prefix")]
    pub prefix: String,
}

impl ApiConfig {
    fn default_prefix() -> String {
        "/api/v1".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default = "CorsConfig::default_allow_credentials")]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }

    fn default_allow_credentials() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: Self::default_allow_credentials(),
            max_age_secs: None,
        }
    }
}

/// 处理会话配置
///
/// 会话缓存是有界的：
/// 容量按结果字节数加权，到容量后按 LFU 淘汰，TTL 到期后按时间淘汰。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 会话 TTL（秒），自创建/覆盖起计
    #[serde(default = "SessionConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    /// 后台维护任务的执行间隔（秒）
    #[serde(default = "SessionConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// 缓存最大容量（字节），按结果字节大小加权
    #[serde(default = "SessionConfig::default_max_bytes")]
    pub max_bytes: u64,
}

impl SessionConfig {
    fn default_ttl_secs() -> u64 {
        30 * 60
    }
    fn default_sweep_interval_secs() -> u64 {
        5 * 60
    }
    fn default_max_bytes() -> u64 {
        256 * 1024 * 1024
    }

    /// 获取会话 TTL
    pub fn ttl_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }

    /// 获取维护任务间隔
    pub fn sweep_interval_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
            max_bytes: Self::default_max_bytes(),
        }
    }
}

/// 图像处理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// 单次上传的 body 大小上限（字节）
    #[serde(default = "ProcessingConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// 并发处理许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 有损编码的默认质量（1-100）
    #[serde(default = "ProcessingConfig::default_quality")]
    pub default_quality: u8,
    /// 单次 PDF 转换接受的图片数量上限
    #[serde(default = "ProcessingConfig::default_max_pdf_images")]
    pub max_pdf_images: usize,
}

impl ProcessingConfig {
    fn default_max_upload_bytes() -> usize {
        25 * 1024 * 1024
    }
    fn default_quality() -> u8 {
        80
    }
    fn default_max_pdf_images() -> usize {
        50
    }

    /// 并发许可数（0 表示按 CPU 核心数）
    pub fn effective_parallelism(&self) -> usize {
        let m = self.max_parallel as usize;
        if m == 0 { num_cpus::get() } else { m }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: Self::default_max_upload_bytes(),
            max_parallel: 0,
            default_quality: Self::default_quality(),
            max_pdf_images: Self::default_max_pdf_images(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 处理会话配置
    #[serde(default)]
    pub session: SessionConfig,
    /// 图像处理配置
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省，缺省时全部走默认值
            .add_source(File::from(config_path.clone()).required(false))
            // 支持环境变量覆盖，例如：APP_API_PREFIX
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        tracing::info!("配置加载完成（文件: {:?}，可被 APP_* 覆盖）", config_path);
        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            cors: CorsConfig::default(),
            session: SessionConfig::default(),
            processing: ProcessingConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}
