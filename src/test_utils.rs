//! Embedded PostgreSQL for integration tests and benchmarks.

use postgresql_embedded::PostgreSQL;
use tracing::info;

use crate::config::BridgeConfig;
use crate::database::Database;
use crate::postgres::PgPool;

/// A running embedded `PostgreSQL` instance and a config pointing at its test database.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub config: BridgeConfig,
}

impl EmbeddedPostgres {
    /// Open a `Database` on the embedded instance.
    ///
    /// # Errors
    /// Propagates pool construction errors.
    pub fn database(&self) -> Result<Database<PgPool>, crate::BridgeError> {
        Database::connect(&self.config)
    }
}

/// Set up and start an embedded `PostgreSQL`, then create `database` on it.
///
/// # Errors
/// Returns an error if the server cannot be installed or started, the database cannot be
/// created, or the post-start `SELECT 1` fails.
pub async fn setup_postgres_embedded(
    database: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let mut postgresql = PostgreSQL::default();
    postgresql.setup().await?;
    postgresql.start().await?;
    postgresql.create_database(database).await?;

    let settings = postgresql.settings();
    let config = BridgeConfig {
        host: settings.host.clone(),
        port: settings.port,
        database: database.to_string(),
        user: settings.username.clone(),
        password: settings.password.clone(),
        max_connections: 4,
        connect_timeout_ms: 5_000,
        ..BridgeConfig::default()
    };
    info!(port = config.port, database, "embedded postgres started");

    let db = Database::connect(&config)?;
    db.query("SELECT 1", &[]).await?;
    db.close();

    Ok(EmbeddedPostgres { postgresql, config })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub async fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    let _ = postgresql.stop().await;
}
