//! Database configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Configuration
// =============================================================================

/// Invalid or missing configuration value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    Missing(&'static str),

    #[error("Invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Development,
    Production,
}

/// Connection settings for the PostgreSQL event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Connection URL (`DATABASE_URL`)
    pub database_url: String,
    /// Pool size (`LEDGERKV_MAX_CONNECTIONS`)
    pub max_connections: u32,
    /// How long a caller waits for a pooled connection
    /// (`LEDGERKV_ACQUIRE_TIMEOUT_SECS`)
    pub acquire_timeout: Duration,
    /// `LEDGERKV_ENV`
    pub environment: Environment,
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = parse_or(
            &lookup,
            "LEDGERKV_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "LEDGERKV_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        let acquire_timeout = parse_or(
            &lookup,
            "LEDGERKV_ACQUIRE_TIMEOUT_SECS",
            DEFAULT_ACQUIRE_TIMEOUT.as_secs(),
        )
        .map(Duration::from_secs)?;

        let environment = match lookup("LEDGERKV_ENV") {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout,
            environment,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Invalid {
                key: "LEDGERKV_ENV",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/kv")]))
            .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/kv");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.acquire_timeout, DEFAULT_ACQUIRE_TIMEOUT);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_missing_url() {
        assert_eq!(
            DbConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
        assert_eq!(
            DbConfig::from_lookup(lookup(&[("DATABASE_URL", "")])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn test_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/kv"),
            ("LEDGERKV_MAX_CONNECTIONS", "32"),
            ("LEDGERKV_ACQUIRE_TIMEOUT_SECS", "30"),
            ("LEDGERKV_ENV", "prod"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 32);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_invalid_values() {
        let err = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/kv"),
            ("LEDGERKV_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LEDGERKV_MAX_CONNECTIONS", .. }));

        let err = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/kv"),
            ("LEDGERKV_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/kv"),
            ("LEDGERKV_ENV", "staging"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid LEDGERKV_ENV: staging");
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
