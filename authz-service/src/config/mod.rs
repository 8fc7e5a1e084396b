use authz_core::config::{self as core_config, get_env, get_env_parse};
use authz_core::error::AppError;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::models::LockoutPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub lockout: LockoutPolicy,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub session_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthzConfig {
            common: core_config::Config::load(is_prod)?,
            environment,
            service_name: get_env("SERVICE_NAME", Some("authz-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env(
                    "DATABASE_URL",
                    Some("postgres://localhost:5432/authz"),
                    is_prod,
                )?,
                max_connections: get_env_parse("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: get_env_parse("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            jwt: JwtConfig {
                // No default: a guessable signing secret silently breaks
                // the session trust boundary.
                secret: get_env("JWT_SECRET", None, is_prod)?,
                session_ttl_minutes: get_env_parse("SESSION_TTL_MINUTES", Some("720"), is_prod)?,
            },
            lockout: LockoutPolicy {
                soft_threshold: get_env_parse("LOCKOUT_SOFT_THRESHOLD", Some("5"), is_prod)?,
                hard_threshold: get_env_parse("LOCKOUT_HARD_THRESHOLD", Some("10"), is_prod)?,
                window_seconds: get_env_parse("LOCKOUT_WINDOW_SECONDS", Some("900"), is_prod)?,
                lock_seconds: get_env_parse("LOCKOUT_LOCK_SECONDS", Some("900"), is_prod)?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env_parse("RATE_LIMIT_LOGIN_ATTEMPTS", Some("30"), is_prod)?,
                login_window_seconds: get_env_parse(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
                global_ip_limit: get_env_parse("RATE_LIMIT_GLOBAL_IP", Some("300"), is_prod)?,
                global_ip_window_seconds: get_env_parse(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
            },
        };

        Ok(config)
    }
}
