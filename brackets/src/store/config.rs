//! Database configuration module.

use super::errors::{StoreError, StoreResult};
use std::{env, str::FromStr};

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,
}

fn var_or<T: FromStr>(name: &str, default: T) -> StoreResult<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| StoreError::Config(format!("{name} has an invalid value {value:?}"))),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 1)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> StoreResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| StoreError::Config("DATABASE_URL must be set".to_string()))?;

        Ok(Self {
            database_url,
            max_connections: var_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: var_or("DB_MIN_CONNECTIONS", 1)?,
            connection_timeout_secs: var_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: var_or("DB_IDLE_TIMEOUT", 600)?,
        })
    }

    /// Default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/brackets` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/brackets".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert!(config.database_url.ends_with("/brackets"));
    }

    #[test]
    fn test_var_or_uses_default_when_unset() {
        let value: u32 = var_or("BRACKETS_TEST_SURELY_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
