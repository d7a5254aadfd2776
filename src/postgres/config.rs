use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod};
use tracing::info;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::pool::ConnectionPool;

/// The process pool for a PostgreSQL target.
pub type PgPool = ConnectionPool<Manager>;

/// Build the PostgreSQL pool described by `config`.
///
/// No connection is opened here; the first `acquire` does that.
///
/// # Errors
/// Returns `BridgeError::ConfigError` if the config is incomplete, or if `ssl` is requested
/// without the `tls` feature.
pub fn build_pg_pool(config: &BridgeConfig) -> Result<PgPool, BridgeError> {
    config.validate()?;

    let mut manager_config = ManagerConfig::default();
    manager_config.recycling_method = RecyclingMethod::Fast;
    let manager = if config.ssl {
        Manager::from_config(config.pg_config(), tls_connector()?, manager_config)
    } else {
        Manager::from_config(config.pg_config(), tokio_postgres::NoTls, manager_config)
    };

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        ssl = config.ssl,
        "configuring postgres pool"
    );
    ConnectionPool::new(manager, config.pool_options())
}

#[cfg(feature = "tls")]
fn tls_connector() -> Result<tokio_postgres_rustls::MakeRustlsConnect, BridgeError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let provider = std::sync::Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| BridgeError::ConfigError(format!("tls setup failed: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(tokio_postgres_rustls::MakeRustlsConnect::new(tls_config))
}

#[cfg(not(feature = "tls"))]
fn tls_connector() -> Result<tokio_postgres::NoTls, BridgeError> {
    Err(BridgeError::ConfigError(
        "ssl requested but legacy-sql-bridge was built without the `tls` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        BridgeConfig {
            database: "app".into(),
            user: "svc".into(),
            ..BridgeConfig::default()
        }
    }

    #[tokio::test]
    async fn pool_builds_without_connecting() {
        let pool = build_pg_pool(&config()).unwrap();
        assert_eq!(pool.status().max_size, 10);
        assert_eq!(pool.status().size, 0);
        pool.close();
        assert!(pool.is_closed());
    }

    #[test]
    fn incomplete_config_is_rejected() {
        let err = build_pg_pool(&BridgeConfig::default()).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(_)));
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn ssl_needs_tls_feature() {
        let cfg = BridgeConfig {
            ssl: true,
            ..config()
        };
        let err = build_pg_pool(&cfg).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(ref m) if m.contains("tls")));
    }
}
