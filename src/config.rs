use std::{env, str::FromStr};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    /// Bearer token lifetime in seconds.
    pub token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Logging
    pub log_dir: String,
    pub log_level: String,
    pub log_stdout: bool,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: or_default("TOKEN_TTL", 86_400)?, // default 24h

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or_default("API_PREFIX", "/api".to_string())?,

            log_dir: or_default("LOG_DIR", "logs".to_string())?,
            log_level: or_default("LOG_LEVEL", "info".to_string())?,
            log_stdout: or_default("LOG_STDOUT", false)?,
        })
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/kintai_test".into(),
        db_max_connections: 1,
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        token_ttl: 3600,
        rate_login_per_min: 60,
        rate_register_per_min: 30,
        rate_protected_per_min: 1000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
        log_level: "debug".into(),
        log_stdout: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let ttl: usize = or_default("KINTAI_TEST_UNSET_TTL", 86_400).unwrap();
        assert_eq!(ttl, 86_400);
    }

    #[test]
    fn required_names_the_variable() {
        let err = required("KINTAI_TEST_UNSET_SECRET").unwrap_err();
        assert!(err.to_string().contains("KINTAI_TEST_UNSET_SECRET"));
    }
}
