//! Runtime configuration parsed from environment variables.
//!
//! Parsing goes through a lookup closure so tests can feed a map instead of
//! mutating the process environment.

use std::time::Duration;

pub const DEFAULT_PROFILE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    Missing { var: String },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_AUTH_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS }
    }
}

/// Connection settings for the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Project base URL without a trailing slash.
    pub url: String,
    /// Public API key sent with every request.
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub auth: AuthConfig,
    pub database_url: String,
    pub db_max_connections: u32,
    pub profile_timeout_secs: u64,
}

impl SyncConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `AUTH_URL`
    /// - `AUTH_ANON_KEY`
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PROFILE_TIMEOUT_SECS`: default 10
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `DB_MAX_CONNECTIONS`: default 5
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a numeric
    /// override does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`SyncConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, "AUTH_URL")?.trim_end_matches('/').to_string();
        let anon_key = required(&lookup, "AUTH_ANON_KEY")?;
        let database_url = required(&lookup, "DATABASE_URL")?;

        let timeouts = HttpTimeouts {
            request_secs: parse_or(&lookup, "AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_or(&lookup, "AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS)?,
        };
        let profile_timeout_secs = parse_or(&lookup, "PROFILE_TIMEOUT_SECS", DEFAULT_PROFILE_TIMEOUT_SECS)?;
        if profile_timeout_secs == 0 {
            return Err(ConfigError::Invalid { var: "PROFILE_TIMEOUT_SECS".into(), value: "0".into() });
        }
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        Ok(Self {
            auth: AuthConfig { url, anon_key, timeouts },
            database_url,
            db_max_connections,
            profile_timeout_secs,
        })
    }

    #[must_use]
    pub fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }
}

fn required<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing { var: var.into() })
}

fn parse_or<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: var.into(), value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
