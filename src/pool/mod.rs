//! The process-wide connection pool.
//!
//! `ConnectionPool` wraps a `deadpool` managed pool: the semaphore inside deadpool is the
//! single synchronization point, and a pooled object returns its slot when dropped, so a
//! connection is released on every exit path (errors, cancellation and panics included).

mod connection;

use std::fmt::Display;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use deadpool::Runtime;
use deadpool::managed::{Manager, Object, Pool, PoolError, TimeoutType};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use connection::{EngineConnection, StatementExecutor};
pub use deadpool::managed;
pub use deadpool::managed::Status as PoolStatus;

use crate::config::PoolOptions;
use crate::error::BridgeError;
use crate::results::NativeResult;
use crate::types::RowValues;

/// A connection checked out of a [`ConnectionPool`]. Dropping it releases the slot.
pub type PooledConnection<M> = Object<M>;

/// Bounded pool of engine connections, generic over the deadpool manager that opens them.
pub struct ConnectionPool<M>
where
    M: Manager + 'static,
{
    inner: Pool<M>,
    options: PoolOptions,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<M> std::fmt::Debug for ConnectionPool<M>
where
    M: Manager + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("options", &self.options)
            .field("status", &self.inner.status())
            .finish_non_exhaustive()
    }
}

impl<M> ConnectionPool<M>
where
    M: Manager + 'static,
    M::Type: EngineConnection,
    M::Error: Display,
{
    /// Build the pool. Connections are opened lazily on first use.
    ///
    /// When called inside a Tokio runtime and `idle_timeout` is set, a reaper task closes
    /// connections that sat idle longer than the timeout.
    ///
    /// # Errors
    /// Returns `BridgeError::ConfigError` for a zero-sized pool or a pool deadpool refuses
    /// to build.
    pub fn new(manager: M, options: PoolOptions) -> Result<Self, BridgeError> {
        if options.max_connections == 0 {
            return Err(BridgeError::ConfigError(
                "maxConnections must be at least 1".to_string(),
            ));
        }
        let inner = Pool::builder(manager)
            .max_size(options.max_connections)
            .wait_timeout(Some(options.connect_timeout))
            .create_timeout(Some(options.connect_timeout))
            .recycle_timeout(Some(options.connect_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BridgeError::ConfigError(format!("failed to build pool: {e}")))?;

        let reaper = options
            .idle_timeout
            .and_then(|idle| spawn_idle_reaper(inner.clone(), idle));
        info!(
            max_connections = options.max_connections,
            connect_timeout_ms = options.connect_timeout.as_millis(),
            "connection pool created"
        );

        Ok(Self {
            inner,
            options,
            reaper: Mutex::new(reaper),
        })
    }

    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Check out a connection, waiting up to `connect_timeout` for a free slot.
    ///
    /// Dropping the returned future abandons the wait without consuming a slot.
    ///
    /// # Errors
    /// `PoolTimeout` when no connection frees up in time, `PoolClosed` after [`close`](Self::close),
    /// `ConnectionError` when opening a new connection fails.
    pub async fn acquire(&self) -> Result<PooledConnection<M>, BridgeError> {
        self.inner.get().await.map_err(|e| self.map_pool_error(e))
    }

    /// Like [`acquire`](Self::acquire), but gives up as soon as `cancel` fires.
    ///
    /// # Errors
    /// `BridgeError::Cancelled` if cancelled first, otherwise as `acquire`.
    pub async fn acquire_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PooledConnection<M>, BridgeError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(BridgeError::Cancelled),
            acquired = self.acquire() => acquired,
        }
    }

    /// Return a healthy connection to the idle set.
    pub fn release(conn: PooledConnection<M>) {
        drop(conn);
    }

    /// Remove a connection from the pool for good; its slot becomes free for a new one.
    pub fn evict(conn: PooledConnection<M>) {
        drop(Object::take(conn));
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Close the pool: idle connections are dropped and waiters fail with `PoolClosed`.
    pub fn close(&self) {
        if let Ok(mut reaper) = self.reaper.lock()
            && let Some(handle) = reaper.take()
        {
            handle.abort();
        }
        if !self.inner.is_closed() {
            self.inner.close();
            info!("connection pool closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn map_pool_error(&self, err: PoolError<M::Error>) -> BridgeError {
        match err {
            PoolError::Timeout(TimeoutType::Wait | TimeoutType::Create) => {
                BridgeError::PoolTimeout {
                    waited: self.options.connect_timeout,
                }
            }
            PoolError::Timeout(TimeoutType::Recycle) => {
                BridgeError::ConnectionError("timed out recycling a connection".to_string())
            }
            PoolError::Closed => BridgeError::PoolClosed,
            PoolError::Backend(e) => BridgeError::ConnectionError(e.to_string()),
            other => BridgeError::ConnectionError(other.to_string()),
        }
    }
}

impl<M> Drop for ConnectionPool<M>
where
    M: Manager + 'static,
{
    fn drop(&mut self) {
        if let Ok(mut reaper) = self.reaper.lock()
            && let Some(handle) = reaper.take()
        {
            handle.abort();
        }
    }
}

fn spawn_idle_reaper<M>(pool: Pool<M>, idle: Duration) -> Option<JoinHandle<()>>
where
    M: Manager + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no Tokio runtime; idle connections will not be reaped");
        return None;
    };
    let period = (idle / 2).max(Duration::from_millis(50));
    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            let removed = pool
                .retain(|_, metrics| metrics.last_used() < idle)
                .removed
                .len();
            if removed > 0 {
                debug!(removed, "closed idle connections");
            }
        }
    }))
}

#[async_trait]
impl<M> StatementExecutor for ConnectionPool<M>
where
    M: Manager + 'static,
    M::Type: EngineConnection,
    M::Error: Display,
{
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<NativeResult, BridgeError> {
        let mut conn = self.acquire().await?;
        debug!(sql, params = params.len(), "executing statement");

        let outcome = match self.options.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, conn.run(sql, params))
                .await
                .map_err(|_| BridgeError::StatementTimeout(limit)),
            None => Ok(conn.run(sql, params).await),
        };

        match outcome {
            Ok(Ok(native)) => {
                Self::release(conn);
                Ok(native)
            }
            Ok(Err(source)) => {
                if conn.is_broken() {
                    warn!(error = %source, "evicting broken connection");
                    Self::evict(conn);
                } else {
                    Self::release(conn);
                }
                Err(BridgeError::Execution {
                    source,
                    sql: sql.to_string(),
                    params: params.to_vec(),
                })
            }
            Err(timeout) => {
                warn!(sql, "statement timed out; evicting connection");
                Self::evict(conn);
                Err(timeout)
            }
        }
    }

    fn close(&self) {
        ConnectionPool::close(self);
    }
}
