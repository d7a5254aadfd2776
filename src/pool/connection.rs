use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, BridgeError};
use crate::results::NativeResult;
use crate::types::RowValues;

/// A live connection to the target engine, as held by the pool.
#[async_trait]
pub trait EngineConnection: Send {
    /// Run one positional statement and collect its rows and affected count.
    ///
    /// # Errors
    /// Returns the driver's own error, unmodified.
    async fn run(&mut self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BoxError>;

    /// Whether the connection can no longer be used (socket closed, protocol desync).
    fn is_broken(&self) -> bool {
        false
    }
}

/// Executes a positional statement on some connection it owns or borrows.
///
/// This is the seam the request builder and the direct helpers are written against; the
/// process pool implements it, and tests substitute an in-memory executor.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// # Errors
    /// Returns pool errors (`PoolTimeout`, `PoolClosed`, ...) or `Execution` wrapping the
    /// engine's error.
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BridgeError>;

    /// Release every resource the executor holds. Further calls fail.
    fn close(&self) {}
}

#[async_trait]
impl<T: StatementExecutor + ?Sized> StatementExecutor for Arc<T> {
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BridgeError> {
        (**self).execute(sql, params).await
    }

    fn close(&self) {
        (**self).close();
    }
}
