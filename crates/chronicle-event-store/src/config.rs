//! Store configuration from the environment.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Environment variable holding the `PostgreSQL` connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Environment variable overriding the pool size.
pub const MAX_CONNECTIONS_VAR: &str = "CHRONICLE_DB_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Errors raised while configuring or connecting the store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable is set to something unusable.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The pool could not connect.
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),

    /// Migrations could not be applied.
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Connection settings for the `PostgreSQL` stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgStoreConfig {
    /// Connection string.
    pub database_url: String,
    /// Upper bound of the connection pool.
    pub max_connections: u32,
}

impl PgStoreConfig {
    /// Creates a config with the default pool size.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Reads `DATABASE_URL` and `CHRONICLE_DB_MAX_CONNECTIONS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is unset and
    /// `ConfigError::Invalid` if the pool size is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let database_url =
            lookup(DATABASE_URL_VAR).ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;
        let max_connections = match lookup(MAX_CONNECTIONS_VAR) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: MAX_CONNECTIONS_VAR,
                        value,
                    });
                }
            },
        };
        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// Builds a connection pool.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Connect` if the database is unreachable.
    pub async fn connect(&self) -> Result<PgPool, ConfigError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;
        tracing::info!(max_connections = self.max_connections, "connected to database");
        Ok(pool)
    }

    /// Builds a connection pool and applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Connect` or `ConfigError::Migrate`.
    pub async fn connect_and_migrate(&self) -> Result<PgPool, ConfigError> {
        let pool = self.connect().await?;
        crate::schema::MIGRATOR.run(&pool).await?;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        vars.iter().map(|(k, v)| (*k, (*v).to_owned())).collect()
    }

    #[test]
    fn test_database_url_is_required() {
        let vars = env(&[]);

        let result = PgStoreConfig::from_lookup(|name| vars.get(name).cloned());

        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_pool_size_defaults_to_ten() {
        let vars = env(&[("DATABASE_URL", "postgres://localhost/db")]);

        let config = PgStoreConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config, PgStoreConfig::new("postgres://localhost/db"));
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_pool_size_is_read_from_environment() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("CHRONICLE_DB_MAX_CONNECTIONS", "25"),
        ]);

        let config = PgStoreConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.max_connections, 25);
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        // Arrange
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("CHRONICLE_DB_MAX_CONNECTIONS", "0"),
        ]);

        // Act
        let result = PgStoreConfig::from_lookup(|name| vars.get(name).cloned());

        // Assert
        match result {
            Err(ConfigError::Invalid { name, value }) => {
                assert_eq!(name, "CHRONICLE_DB_MAX_CONNECTIONS");
                assert_eq!(value, "0");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
