use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_seconds: i64,
    pub jwt_refresh_expiration_days: i64,
    pub jwt_auth_header_prefix: String,
    pub bind_address: String,
    pub page_size: usize,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::Empty("JWT_SECRET"));
        }

        let page_size = parse_or(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            jwt_secret,
            jwt_expiration_seconds: parse_or(&lookup, "JWT_EXPIRATION_SECONDS", 300)?,
            jwt_refresh_expiration_days: parse_or(&lookup, "JWT_REFRESH_EXPIRATION_DAYS", 7)?,
            jwt_auth_header_prefix: lookup("JWT_AUTH_HEADER_PREFIX")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "JWT".to_string()),
            bind_address: lookup("BIND_ADDRESS")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            page_size,
            admin_username: lookup("ADMIN_USERNAME").filter(|v| !v.is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
