use std::time::Duration;

use clap::{Args, Parser};
use serde::Deserialize;

use crate::error::BridgeError;

/// Connection settings for the target PostgreSQL server.
///
/// Read from the environment or flags (`clap`), or from JSON with camelCase keys:
/// ```rust
/// use legacy_sql_bridge::config::BridgeConfig;
///
/// let cfg = BridgeConfig::from_json_str(
///     r#"{"host": "db", "database": "freelance", "user": "app", "maxConnections": 4}"#,
/// )?;
/// assert_eq!(cfg.port, 5432);
/// assert_eq!(cfg.max_connections, 4);
/// # Ok::<(), legacy_sql_bridge::BridgeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,

    #[arg(long = "db-name", env = "DB_NAME", default_value = "")]
    pub database: String,

    #[arg(long = "db-user", env = "DB_USER", default_value = "")]
    pub user: String,

    #[arg(long = "db-password", env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Use TLS to the server
    #[arg(long = "db-ssl", env = "DB_SSL")]
    pub ssl: bool,

    /// Upper bound on concurrently open connections
    #[arg(long = "db-max-connections", env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: usize,

    /// Idle connections older than this are closed; 0 disables the reaper
    #[arg(long = "db-idle-timeout-ms", env = "DB_IDLE_TIMEOUT_MS", default_value_t = 30_000)]
    #[serde(rename = "idleTimeout")]
    pub idle_timeout_ms: u64,

    /// How long to wait for a free (or new) connection before failing
    #[arg(long = "db-connect-timeout-ms", env = "DB_CONNECT_TIMEOUT_MS", default_value_t = 15_000)]
    #[serde(rename = "connectTimeout")]
    pub connect_timeout_ms: u64,

    /// Optional upper bound on a single statement
    #[arg(long = "db-statement-timeout-ms", env = "DB_STATEMENT_TIMEOUT_MS")]
    #[serde(rename = "statementTimeout")]
    pub statement_timeout_ms: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            ssl: false,
            max_connections: 10,
            idle_timeout_ms: 30_000,
            connect_timeout_ms: 15_000,
            statement_timeout_ms: None,
        }
    }
}

#[derive(Parser)]
#[command(name = "legacy-sql-bridge")]
struct EnvOnly {
    #[command(flatten)]
    config: BridgeConfig,
}

impl BridgeConfig {
    /// Read `DB_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    /// Returns `BridgeError::ConfigError` if a variable fails to parse or validation fails.
    pub fn from_env() -> Result<Self, BridgeError> {
        let parsed = EnvOnly::try_parse_from(["legacy-sql-bridge"])
            .map_err(|e| BridgeError::ConfigError(e.to_string()))?;
        parsed.config.validate()?;
        Ok(parsed.config)
    }

    /// Parse a JSON document using the camelCase option names.
    ///
    /// # Errors
    /// Returns `BridgeError::ConfigError` for malformed JSON or failed validation.
    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig = serde_json::from_str(json)
            .map_err(|e| BridgeError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings can describe a usable pool.
    ///
    /// # Errors
    /// Returns `BridgeError::ConfigError` naming the first missing or invalid field.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::ConfigError("host is required".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(BridgeError::ConfigError("database is required".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(BridgeError::ConfigError("user is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(BridgeError::ConfigError(
                "maxConnections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pool sizing and timeouts derived from this config.
    #[must_use]
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            idle_timeout: (self.idle_timeout_ms > 0)
                .then(|| Duration::from_millis(self.idle_timeout_ms)),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            statement_timeout: self.statement_timeout_ms.map(Duration::from_millis),
        }
    }

    /// `tokio-postgres` connection parameters.
    #[must_use]
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .application_name("legacy-sql-bridge");
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        pg.ssl_mode(if self.ssl {
            tokio_postgres::config::SslMode::Require
        } else {
            tokio_postgres::config::SslMode::Disable
        });
        pg
    }
}

/// Sizing and timeouts for [`crate::pool::ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: usize,
    pub idle_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub statement_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        BridgeConfig::default().pool_options()
    }
}
