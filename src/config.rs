/*
 * Responsibility
 * - 環境変数の読み込み (PORT, APP_ENV, challenge / session lookup 設定)
 * - session lookup の宛先 host allowlist (SESSION_LOOKUP_ALLOWED_HOSTS)
 * - 設定値のバリデーション (不正値なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::services::auth::challenge::DEFAULT_LOGIN_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub redirect_to_login_on_challenge: bool,
    pub login_path: String,

    pub session_lookup_timeout: Duration,
    pub trust_forwarded_headers: bool,
    /// Lowercased `host` or `host:port` entries. Empty refuses every lookup.
    pub session_lookup_allowed_hosts: Vec<String>,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&var, "PORT", 3000)?;

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let redirect_to_login_on_challenge =
            parse_bool(&var, "REDIRECT_TO_LOGIN_ON_CHALLENGE", false)?;

        let login_path = var("LOGIN_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        // relative path only: the redirect must stay on this host
        if !login_path.starts_with('/') || login_path.starts_with("//") {
            return Err(ConfigError::Invalid("LOGIN_PATH"));
        }

        let session_lookup_timeout =
            Duration::from_secs(parse_or(&var, "SESSION_LOOKUP_TIMEOUT_SECONDS", 10)?);

        let trust_forwarded_headers = parse_bool(&var, "TRUST_FORWARDED_HEADERS", false)?;

        let session_lookup_allowed_hosts = parse_hosts(&var, "SESSION_LOOKUP_ALLOWED_HOSTS")?;

        let request_timeout = Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECONDS", 30)?);

        let request_body_limit_bytes = parse_or(&var, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            redirect_to_login_on_challenge,
            login_path,
            session_lookup_timeout,
            trust_forwarded_headers,
            session_lookup_allowed_hosts,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

fn parse_bool<F>(var: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => match s.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

/// Comma separated `host[:port]` list. Userinfo, paths and schemes are rejected.
fn parse_hosts<F>(var: &F, key: &'static str) -> Result<Vec<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let authority = Authority::from_str(entry).map_err(|_| ConfigError::Invalid(key))?;
            if authority.as_str().contains('@') || authority.host().is_empty() {
                return Err(ConfigError::Invalid(key));
            }
            Ok(authority.as_str().to_ascii_lowercase())
        })
        .collect()
}
