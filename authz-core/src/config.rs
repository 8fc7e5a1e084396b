//! Environment-driven configuration helpers.
//!
//! In production every variable must be set explicitly; in development a
//! missing variable falls back to its default when one exists.

use crate::error::AppError;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Common configuration shared by every service binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
}

impl Config {
    pub fn load(is_prod: bool) -> Result<Self, AppError> {
        Ok(Self {
            port: get_env_parse("PORT", Some("8080"), is_prod)?,
        })
    }
}

/// Read an environment variable, falling back to `default` outside prod.
pub fn get_env(name: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => match default {
            Some(value) if !is_prod => Ok(value.to_string()),
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "Missing required environment variable: {}",
                name
            ))),
        },
    }
}

/// Read and parse an environment variable.
pub fn get_env_parse<T>(name: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name, default, is_prod)?;
    raw.parse::<T>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_used_in_dev() {
        let value = get_env("AUTHZ_CORE_TEST_UNSET_VAR", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_default_rejected_in_prod() {
        let result = get_env("AUTHZ_CORE_TEST_UNSET_VAR", Some("fallback"), true);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_number() {
        std::env::set_var("AUTHZ_CORE_TEST_PORT", "9090");
        let value: u16 = get_env_parse("AUTHZ_CORE_TEST_PORT", None, true).unwrap();
        assert_eq!(value, 9090);
        std::env::remove_var("AUTHZ_CORE_TEST_PORT");
    }
}
