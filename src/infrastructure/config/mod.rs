//! 配置加载模块
//!
//! 按顺序叠加：内置默认值 → 配置文件（appsettings.*）→ `APP__` 前缀环境变量 →
//! 兼容的单独环境变量（`DATABASE_URL`、`JWT_SECRET`、`PORT`）。
//! 加载后立即校验，任何错误都会让进程在开始服务前退出。

use std::collections::HashSet;
use std::env;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::infrastructure::cache::CacheLocation;
use crate::shared::constants::{cache, cors, http, jwt};

/// 启动配置错误（致命）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT签名密钥未配置")]
    MissingSecret,

    #[error("不支持的签名算法: {0}")]
    UnsupportedAlgorithm(String),

    #[error("缓存配置重复: {0}")]
    DuplicateCacheProfile(String),

    #[error("路由引用了不存在的缓存配置: {0}")]
    UnknownCacheProfile(String),

    #[error("配置无效: {0}")]
    Invalid(String),

    #[error("配置加载失败: {0}")]
    Load(#[from] ::config::ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 存储连接描述符，缺省时使用内存存储
    pub database_url: Option<String>,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9527,
            host: "0.0.0.0".to_string(),
            request_timeout_seconds: http::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 5,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: 600,
            max_lifetime_seconds: 1800,
            test_before_acquire: true,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub token_expiry_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_algorithm: jwt::DEFAULT_ALGORITHM.to_string(),
            token_expiry_hours: jwt::DEFAULT_TOKEN_EXPIRY_HOURS,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AuthConfig {
    /// Token 有效期，超出 1..=MAX_TOKEN_EXPIRY_HOURS 视为配置错误
    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let hours = self.token_expiry_hours;
        if !(1..=jwt::MAX_TOKEN_EXPIRY_HOURS).contains(&hours) {
            return Err(ConfigError::Invalid(format!(
                "token_expiry_hours 必须在1-{}之间",
                jwt::MAX_TOKEN_EXPIRY_HOURS
            )));
        }
        chrono::Duration::try_hours(hours)
            .ok_or_else(|| ConfigError::Invalid(format!("token_expiry_hours 超出范围: {}", hours)))
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("token_expiry_hours", &self.token_expiry_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// 单个缓存配置（对应一个命名的 CacheProfile）
#[derive(Debug, Clone, Deserialize)]
pub struct CacheProfileConfig {
    pub name: String,
    pub duration_seconds: u64,
    #[serde(default, deserialize_with = "string_list")]
    pub vary_by_query_keys: Vec<String>,
    #[serde(default)]
    pub location: CacheLocation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_body_bytes: usize,
    pub max_entries: usize,
    /// 后台清理间隔，0 表示只做惰性淘汰
    pub sweep_interval_seconds: u64,
    pub profiles: Vec<CacheProfileConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: cache::MAX_BODY_SIZE_BYTES,
            max_entries: cache::MAX_CACHE_SIZE,
            sweep_interval_seconds: cache::SWEEP_INTERVAL_SECONDS,
            profiles: vec![
                CacheProfileConfig {
                    name: cache::DEFAULT_10.to_string(),
                    duration_seconds: 10,
                    vary_by_query_keys: vec![cache::VARY_BY_ALL_QUERY_KEYS.to_string()],
                    location: CacheLocation::Shared,
                },
                CacheProfileConfig {
                    name: cache::DEFAULT_20.to_string(),
                    duration_seconds: 20,
                    vary_by_query_keys: vec![cache::VARY_BY_ALL_QUERY_KEYS.to_string()],
                    location: CacheLocation::Shared,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    #[serde(deserialize_with = "string_list")]
    pub allowed_origins: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub allowed_methods: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: cors::DEFAULT_ALLOWED_METHODS.iter().map(|m| m.to_string()).collect(),
            allowed_headers: cors::DEFAULT_ALLOWED_HEADERS.iter().map(|h| h.to_string()).collect(),
            allow_credentials: false,
            max_age_seconds: cors::DEFAULT_MAX_AGE_SECONDS,
        }
    }
}

impl Config {
    /// 从默认位置加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// 从指定配置文件加载（文件必须存在），未指定时尝试可选的 appsettings.*
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder();
        let builder = match path {
            Some(path) => builder.add_source(::config::File::from(path).required(true)),
            None => builder.add_source(::config::File::with_name("appsettings").required(false)),
        };

        let config: Config = builder
            .add_source(
                ::config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database_url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// 校验配置的不变量
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        self.auth.token_ttl()?;
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid("bcrypt_cost 必须在4-31之间".to_string()));
        }

        let mut names = HashSet::new();
        for profile in &self.cache.profiles {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::Invalid("缓存配置名不能为空".to_string()));
            }
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateCacheProfile(profile.name.clone()));
            }
        }

        Ok(())
    }

    /// 是否配置了外部存储
    pub fn has_database(&self) -> bool {
        self.database_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// 同时接受列表和逗号分隔字符串（便于通过环境变量配置）
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let values = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(raw) => raw.split(',').map(str::to_string).collect(),
        StringOrList::Many(list) => list,
    };

    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}
