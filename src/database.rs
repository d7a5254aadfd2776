use tracing::info;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::pool::StatementExecutor;
use crate::postgres::{PgPool, build_pg_pool};
use crate::request::Request;

/// The process-wide database service: one executor (normally the connection pool) shared
/// by every request and helper call.
///
/// Construct it once at startup, hand out references, and call [`close`](Self::close) on
/// shutdown.
#[derive(Debug)]
pub struct Database<E: StatementExecutor> {
    executor: E,
}

impl Database<PgPool> {
    /// Create the PostgreSQL pool described by `config`.
    ///
    /// Connections are opened on first use.
    ///
    /// # Errors
    /// Returns `BridgeError::ConfigError` for an incomplete or unusable config.
    pub fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let pool = build_pg_pool(config)?;
        Ok(Self::new(pool))
    }
}

impl<E: StatementExecutor> Database<E> {
    /// Wrap any executor; tests use this to substitute an in-memory one.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Start a legacy-style request with named bindings.
    #[must_use]
    pub fn new_request(&self) -> Request<'_, E> {
        Request::new(&self.executor)
    }

    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Tear down the executor. Calls made afterwards fail with `PoolClosed`.
    pub fn close(&self) {
        self.executor.close();
        info!("database closed");
    }
}
