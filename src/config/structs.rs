use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Cookie SameSite 策略
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr,
)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// PayFast 运行模式
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    EnumIter,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PayfastMode {
    #[default]
    Sandbox,
    Live,
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 服务器地址、端口、CPU 数量
/// - database: 数据库连接与重试
/// - logging: 日志配置
/// - auth: JWT 与 Cookie
/// - app: 对外访问地址
/// - analytics: 汇总缓存与后台刷新池
/// - payfast: 支付网关
/// - qr: 二维码图片提供方
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub payfast: PayfastConfig,
    #[serde(default)]
    pub qr: QrConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：SK，分隔符：__
    /// 示例：SK__SERVER__PORT=9999
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        let path = "config.toml";

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SK")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut loaded = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        };

        if loaded.auth.jwt_secret.is_empty() {
            eprintln!(
                "[WARN] auth.jwt_secret is not set, generated an ephemeral secret (sessions end on restart)"
            );
            loaded.auth.jwt_secret = crate::utils::generate_random_code(48);
        }

        loaded
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 客户端请求超时（秒）
    #[serde(default = "default_client_request_timeout")]
    pub client_request_timeout: u64,
    /// 优雅关闭等待时间（秒）
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
    /// 可信反向代理（IP 或 CIDR）；为空时信任来自私有地址的转发头
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 签名密钥，留空时启动生成临时密钥
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cookie_same_site: SameSitePolicy,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    /// 登录/注册限流：每 IP 每秒补充令牌数
    #[serde(default = "default_login_rate_per_second")]
    pub login_rate_per_second: u64,
    #[serde(default = "default_login_burst")]
    pub login_burst: u32,
}

/// 对外访问配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 公开访问地址，用于名片链接与支付回调
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 分析统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 汇总缓存有效期（秒）
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_refresh_workers")]
    pub refresh_workers: usize,
    #[serde(default = "default_refresh_queue_capacity")]
    pub refresh_queue_capacity: usize,
    #[serde(default = "default_refresh_max_attempts")]
    pub refresh_max_attempts: u32,
    #[serde(default = "default_refresh_base_delay_ms")]
    pub refresh_base_delay_ms: u64,
}

/// PayFast 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayfastConfig {
    #[serde(default = "default_merchant_id")]
    pub merchant_id: String,
    #[serde(default = "default_merchant_key")]
    pub merchant_key: String,
    /// 签名口令，留空表示不追加 passphrase
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub mode: PayfastMode,
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
    #[serde(default = "default_live_url")]
    pub live_url: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl PayfastConfig {
    /// 当前模式下的 process 地址
    pub fn process_url(&self) -> &str {
        match self.mode {
            PayfastMode::Sandbox => &self.sandbox_url,
            PayfastMode::Live => &self.live_url,
        }
    }
}

/// 二维码配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrConfig {
    /// 图片生成服务地址，`data` 与 `size` 以查询参数附加
    #[serde(default = "default_qr_provider_url")]
    pub provider_url: String,
    #[serde(default = "default_qr_size")]
    pub size: u32,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_client_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_database_url() -> String {
    "skafolio.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_access_token_minutes() -> u64 {
    15
}

fn default_refresh_token_days() -> u64 {
    7
}

fn default_login_rate_per_second() -> u64 {
    1
}

fn default_login_burst() -> u32 {
    10
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_refresh_workers() -> usize {
    2
}

fn default_refresh_queue_capacity() -> usize {
    1024
}

fn default_refresh_max_attempts() -> u32 {
    3
}

fn default_refresh_base_delay_ms() -> u64 {
    200
}

fn default_merchant_id() -> String {
    "10000100".to_string()
}

fn default_merchant_key() -> String {
    "46f0cd694581a".to_string()
}

fn default_sandbox_url() -> String {
    "https://sandbox.payfast.co.za/eng/process".to_string()
}

fn default_live_url() -> String {
    "https://www.payfast.co.za/eng/process".to_string()
}

fn default_currency() -> String {
    "PKR".to_string()
}

fn default_qr_provider_url() -> String {
    "https://api.qrserver.com/v1/create-qr-code/".to_string()
}

fn default_qr_size() -> u32 {
    300
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            client_request_timeout: default_client_request_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
            cookie_secure: false,
            cookie_same_site: SameSitePolicy::default(),
            cookie_domain: None,
            login_rate_per_second: default_login_rate_per_second(),
            login_burst: default_login_burst(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            refresh_workers: default_refresh_workers(),
            refresh_queue_capacity: default_refresh_queue_capacity(),
            refresh_max_attempts: default_refresh_max_attempts(),
            refresh_base_delay_ms: default_refresh_base_delay_ms(),
        }
    }
}

impl Default for PayfastConfig {
    fn default() -> Self {
        Self {
            merchant_id: default_merchant_id(),
            merchant_key: default_merchant_key(),
            passphrase: String::new(),
            mode: PayfastMode::default(),
            sandbox_url: default_sandbox_url(),
            live_url: default_live_url(),
            currency: default_currency(),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            provider_url: default_qr_provider_url(),
            size: default_qr_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[payfast]"));
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.analytics.cache_ttl_secs, 300);
        assert_eq!(parsed.payfast.mode, PayfastMode::Sandbox);
    }

    #[test]
    fn test_process_url_follows_mode() {
        let mut cfg = PayfastConfig::default();
        assert_eq!(cfg.process_url(), "https://sandbox.payfast.co.za/eng/process");
        cfg.mode = PayfastMode::Live;
        assert_eq!(cfg.process_url(), "https://www.payfast.co.za/eng/process");
    }

    #[test]
    fn test_payfast_mode_parsing() {
        assert_eq!(PayfastMode::from_str("LIVE").unwrap(), PayfastMode::Live);
        assert!(PayfastMode::from_str("prod").is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [payfast]
            passphrase = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.payfast.passphrase, "secret");
        assert_eq!(parsed.payfast.merchant_id, "10000100");
        assert_eq!(parsed.auth.access_token_minutes, 15);
    }
}
