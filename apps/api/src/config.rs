use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    /// Half-width of the active window around an event's date, in days.
    pub event_window_days: u32,
    pub port: u16,
    pub rust_log: String,
}

/// Bearer-token verification settings. Tokens are issued by the external
/// identity provider and signed with a shared HS256 secret.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

pub const DEFAULT_EVENT_WINDOW_DAYS: u32 = 3;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            auth: AuthConfig {
                jwt_secret: require_env("AUTH_JWT_SECRET")?,
                issuer: optional_env("AUTH_JWT_ISSUER"),
                audience: optional_env("AUTH_JWT_AUDIENCE"),
                leeway_seconds: parse_env("AUTH_JWT_LEEWAY_SECONDS", 30)?,
            },
            event_window_days: parse_env("EVENT_WINDOW_DAYS", DEFAULT_EVENT_WINDOW_DAYS)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

pub fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
