//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:8080"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 允许跨域携带凭据的来源
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 签名密钥（至少 32 字节）
    pub jwt_secret: Secret<String>,
    /// 令牌过期策略: sliding, next_midnight
    pub token_expiry: String,
    /// sliding 策略下的令牌有效期（秒）
    pub token_ttl_secs: u64,
    /// 会话 Cookie 名称
    pub cookie_name: String,
    /// Cookie 是否带 Secure 属性
    pub cookie_secure: bool,
    /// Cookie SameSite 属性: strict, lax, none
    pub cookie_same_site: String,
    /// 密码最小长度
    pub password_min_length: usize,
    /// 密码必须包含数字
    pub password_require_digit: bool,
    /// 密码必须包含大写字母
    pub password_require_uppercase: bool,
    /// Argon2 内存开销（KiB）
    pub argon2_memory_kib: u32,
    /// Argon2 迭代次数
    pub argon2_iterations: u32,
    /// Argon2 并行度
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:8080")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default(
                "server.cors_origins",
                vec!["http://localhost:3000", "http://localhost:8080", "http://localhost:4200"],
            )?
            .set_default("database.url", "postgresql://localhost/credential_service")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.token_expiry", "sliding")?
            .set_default("security.token_ttl_secs", 86400)?
            .set_default("security.cookie_name", "jwt")?
            .set_default("security.cookie_secure", true)?
            .set_default("security.cookie_same_site", "lax")?
            .set_default("security.password_min_length", 8)?
            .set_default("security.password_require_digit", false)?
            .set_default("security.password_require_uppercase", false)?
            .set_default("security.argon2_memory_kib", 19456)?
            .set_default("security.argon2_iterations", 2)?
            .set_default("security.argon2_parallelism", 1)?;

        // 签名密钥没有默认值，必须由 AUTH_SECURITY__JWT_SECRET 提供
        // 从环境变量加载配置（前缀为 AUTH_）
        settings = settings.add_source(
            Environment::with_prefix("AUTH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // HS256 需要至少 256 位密钥
        if self.security.jwt_secret.expose_secret().len() < 32 {
            return Err(ConfigError::Message(
                "JWT secret must be at least 32 bytes long".to_string(),
            ));
        }

        // 验证令牌过期策略
        match self.security.token_expiry.to_lowercase().as_str() {
            "sliding" | "next_midnight" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid token expiry policy: {}. Must be one of: sliding, next_midnight",
                    self.security.token_expiry
                )))
            }
        }

        if self.security.token_ttl_secs < 60 || self.security.token_ttl_secs > 2_592_000 {
            return Err(ConfigError::Message(
                "token_ttl_secs must be between 60 and 2592000 (1 minute to 30 days)".to_string(),
            ));
        }

        // 验证 Cookie 配置
        if self.security.cookie_name.is_empty()
            || !self
                .security
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Message(format!(
                "Invalid cookie name: {:?}",
                self.security.cookie_name
            )));
        }

        match self.security.cookie_same_site.to_lowercase().as_str() {
            "strict" | "lax" => {}
            // 浏览器拒绝不带 Secure 的 SameSite=None
            "none" if self.security.cookie_secure => {}
            "none" => {
                return Err(ConfigError::Message(
                    "cookie_same_site=none requires cookie_secure=true".to_string(),
                ))
            }
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid cookie SameSite: {}. Must be one of: strict, lax, none",
                    self.security.cookie_same_site
                )))
            }
        }

        // 验证密码策略
        if self.security.password_min_length < 1 || self.security.password_min_length > 128 {
            return Err(ConfigError::Message(
                "password_min_length must be between 1 and 128".to_string(),
            ));
        }

        // 验证 Argon2 参数（与 argon2 crate 的下限一致）
        if self.security.argon2_parallelism < 1 || self.security.argon2_iterations < 1 {
            return Err(ConfigError::Message(
                "argon2_iterations and argon2_parallelism must be >= 1".to_string(),
            ));
        }

        if self.security.argon2_memory_kib < 8 * self.security.argon2_parallelism {
            return Err(ConfigError::Message(
                "argon2_memory_kib must be >= 8 * argon2_parallelism".to_string(),
            ));
        }

        Ok(())
    }
}
