use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::DatabaseError;

pub const DEFAULT_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            pool_size: 5,
        }
    }
}

impl DatabaseConfig {
    /// Resolution order: CLI argument, `DATABASE_URL`, YAML value, in-memory.
    pub fn from_cli_or_env_or_yaml(cli_arg: Option<String>, yaml_config: Option<String>) -> Self {
        let url = if let Some(arg) = cli_arg {
            arg
        } else if let Ok(env) = std::env::var("DATABASE_URL") {
            env
        } else if let Some(yaml) = yaml_config {
            yaml
        } else {
            DEFAULT_URL.to_string()
        };

        Self {
            url,
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, DatabaseError> {
        let options = if self.url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&self.url)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&self.url)
        };
        Ok(options.create_if_missing(true).foreign_keys(true))
    }

    /// An in-memory database lives inside a single connection, so the pool
    /// is pinned to one connection that never expires.
    pub async fn create_pool(&self) -> Result<SqlitePool, DatabaseError> {
        let options = self.connect_options()?;
        let pool_options = if self.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(self.pool_size.max(1))
        };
        tracing::debug!(url = %self.url, "Opening score database");
        pool_options
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_argument_wins() {
        let config = DatabaseConfig::from_cli_or_env_or_yaml(
            Some("scores.db".to_string()),
            Some("other.db".to_string()),
        );
        assert_eq!(config.url, "scores.db");
        assert!(!config.is_memory());
    }

    #[test]
    fn test_memory_detection() {
        assert!(DatabaseConfig::default().is_memory());
        let config = DatabaseConfig {
            url: "sqlite:file:scores?mode=memory&cache=shared".to_string(),
            pool_size: 4,
        };
        assert!(config.is_memory());
    }

    #[tokio::test]
    async fn test_memory_pool_opens() {
        let pool = DatabaseConfig::default().create_pool().await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }
}
