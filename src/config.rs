use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_TEST_SERVICE_URL: &str = "https://randomuser.me/api/";
pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 30;
/// One week. Tokens cannot be revoked, so lifetimes stay short.
pub const MAX_TOKEN_EXPIRE_MINUTES: i64 = 7 * 24 * 60;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Token signing settings. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(
        secret_key: impl Into<String>,
        algorithm: Algorithm,
        access_token_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let secret_key = secret_key.into();
        if secret_key.is_empty() {
            return Err(ConfigError::Missing("SECRET_KEY"));
        }
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                key: "ALGORITHM",
                reason: format!("{:?} is not a shared-secret algorithm", algorithm),
            });
        }
        Ok(AuthConfig {
            secret_key,
            algorithm,
            access_token_ttl,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub test_service_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Reads the process environment. `.env` is expected to be loaded already.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secret_key = lookup("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let algorithm = match lookup("ALGORITHM") {
            Some(raw) => Algorithm::from_str(&raw).map_err(|e| ConfigError::Invalid {
                key: "ALGORITHM",
                reason: e.to_string(),
            })?,
            None => Algorithm::HS256,
        };

        let expire_minutes = parse_or(
            &lookup,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            DEFAULT_TOKEN_EXPIRE_MINUTES,
        )?;
        if !(1..=MAX_TOKEN_EXPIRE_MINUTES).contains(&expire_minutes) {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                reason: format!("must be between 1 and {}", MAX_TOKEN_EXPIRE_MINUTES),
            });
        }
        let access_token_ttl =
            Duration::try_minutes(expire_minutes).ok_or_else(|| ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                reason: "out of range".to_string(),
            })?;

        Ok(AppConfig {
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            bind_address: lookup("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            test_service_url: lookup("TEST_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_TEST_SERVICE_URL.to_string()),
            auth: AuthConfig::new(secret_key, algorithm, access_token_ttl)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
