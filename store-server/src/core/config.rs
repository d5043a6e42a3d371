use std::path::PathBuf;

use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATA_DIR | /var/lib/bookstall | 数据目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | PUBLIC_BASE_URL | http://localhost:3000 | 回调 URL 的外部基址 |
/// | CURRENCY | ETB | 结算币种 |
/// | CHAPA_SECRET_KEY | (空) | 网关密钥 |
/// | CHAPA_BASE_URL | https://api.chapa.co/v1 | 网关地址 |
/// | CHAPA_WEBHOOK_SECRET | (空) | webhook 签名密钥 |
/// | GATEWAY_TIMEOUT_MS | 15000 | 网关调用超时(毫秒) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// DATA_DIR=/data/bookstall HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录，存储数据库和日志
    pub data_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 对外基址 (网关回调/跳转用)
    pub public_base_url: String,
    /// JWT 校验配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 支付网关配置 ===
    /// 结算币种
    pub currency: String,
    /// 网关 API 密钥
    pub chapa_secret_key: String,
    /// 网关 API 基址 (None 用官方地址)
    pub chapa_base_url: Option<String>,
    /// webhook 签名共享密钥
    pub webhook_secret: String,
    /// 网关调用超时 (毫秒)
    pub gateway_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/var/lib/bookstall".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "ETB".into()),
            chapa_secret_key: std::env::var("CHAPA_SECRET_KEY").unwrap_or_default(),
            chapa_base_url: std::env::var("CHAPA_BASE_URL").ok(),
            webhook_secret: std::env::var("CHAPA_WEBHOOK_SECRET").unwrap_or_default(),
            gateway_timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(15_000),
        }
    }

    /// 数据库目录
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("database")
    }

    /// 确保数据目录结构存在
    pub fn ensure_data_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
