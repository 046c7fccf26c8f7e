use std::{fmt, net::SocketAddr};

/// 默认监听地址
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid listen address `{0}`")]
    InvalidAddr(String),
}

/// 服务配置，启动时从环境变量读取一次
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("addr", &self.addr)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Config {
    /// 读取环境变量，存在 `.env` 文件时先加载
    ///
    /// - `DATABASE_URL`：必填
    /// - `JWT_SECRET`：必填且不能为空
    /// - `DEVLOG_ADDR`：默认 `0.0.0.0:8080`
    /// - `DEVLOG_CORS_ORIGINS`：逗号分隔，可选
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            let value = lookup(key).ok_or(ConfigError::Missing(key))?;
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(key));
            }
            Ok(value)
        };

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let addr = lookup("DEVLOG_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;

        let cors_origins = lookup("DEVLOG_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            addr,
            cors_origins,
        })
    }
}
